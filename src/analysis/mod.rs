//! AST-backed extraction of Go declarations.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Go source files │────▶│ GoAnalyzer   │────▶│ SourceFile    │
//! └─────────────────┘     │ (tree-sitter)│     │ (types, methods,
//!                         └──────────────┘     │  consts, docs)│
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                                              ┌───────────────┐
//!                          PackageProvider ◀───│AnalysisContext│
//!                                              │ (files, pkgs) │
//!                                              └───────────────┘
//! ```

mod context;
mod facts;
mod go;
mod package;

pub use context::AnalysisContext;
pub use facts::{
    CommentLine, ConstDecl, DocComment, FieldDecl, Import, ImportKind, MethodDecl, ParamDecl,
    SourceFile, Span, TypeDecl, TypeDeclKind, TypeExpr,
};
pub use go::{GoAnalyzer, ParsedFile};
pub use package::{Package, PackageOrigin, PackageProvider};

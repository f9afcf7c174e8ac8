//! Routescan - static analysis for annotated Go controllers.
//!
//! Routescan reads Go sources, finds controller structs and their
//! annotated route methods, and builds a deduplicated symbol graph of
//! routes, parameters, return values and the models they reference. The
//! graph is validated into a tree of severity-classified diagnostics and
//! flattened into metadata that spec and code generators consume.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter extraction of Go declarations and lazy package loading
//! - `annotations`: `@Kind(value, {options})` comment parsing
//! - `resolve`: type name resolution against import tables and the universe scope
//! - `graph`: graph construction with structural type dedup and cycle guards
//! - `cache`: content-addressed metadata cache keyed by declaration identity
//! - `diagnostics`: validation rules and the per-entity diagnostics tree
//! - `reduce`: flattening into the metadata contract
//! - `pipeline`: `generate_graph` / `validate` / `run` entry points
//! - `config`, `report`, `cli`: the command-line collaborator

pub mod analysis;
pub mod annotations;
pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod pipeline;
pub mod reduce;
pub mod report;
pub mod resolve;

pub use analysis::{AnalysisContext, GoAnalyzer, PackageProvider, SourceFile};
pub use cache::{FileVersion, MetadataCache};
pub use config::Config;
pub use diagnostics::{validate, Diagnostic, DiagnosticCode, DiagnosticEntity, Severity};
pub use error::{AnalysisError, BuildFailure, PipelineError, ValidationFailure};
pub use graph::{GraphBuilder, SymbolGraph};
pub use pipeline::Pipeline;
pub use reduce::{reduce, ReducedMetadata};

//! Type reference resolution.
//!
//! Given a type expression and the file it appears in, find the declaration
//! it names or classify it as predeclared or standard-library. Resolution
//! order for `Name`: dot-imported packages, the declaring package, then the
//! universe scope. `pkg.Name` goes through the file's import table.

mod universe;

pub use universe::{is_primitive, is_universe_type};

use std::sync::Arc;

use tracing::trace;

use crate::analysis::{
    Import, ImportKind, Package, PackageOrigin, PackageProvider, SourceFile, TypeDecl, TypeExpr,
};
use crate::error::AnalysisError;
use crate::metadata::DeclId;

/// A container layer still holding unresolved map keys.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprLayer<'a> {
    Pointer,
    Slice,
    Array(&'a str),
    Map(&'a TypeExpr),
    Chan,
}

/// A type declaration found in a loaded package.
#[derive(Debug, Clone)]
pub struct ResolvedDecl {
    pub id: DeclId,
    pub package: Arc<Package>,
    /// The file containing the declaration.
    pub file: Arc<SourceFile>,
    pub decl: TypeDecl,
    /// How the referencing file reached the declaration.
    pub import_kind: ImportKind,
}

/// Outcome of resolving a named type.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Predeclared identifier.
    Universe(&'static str),
    /// Standard library type; opaque, never loaded.
    Special {
        package_path: String,
        package_name: String,
        name: String,
        import_kind: ImportKind,
    },
    Declared(ResolvedDecl),
    /// Inline type literal that cannot be named.
    Opaque(String),
    Unresolved { reason: String },
}

/// Peel containers off a type expression, outermost first.
pub fn unwrap_containers(expr: &TypeExpr) -> (Vec<ExprLayer<'_>>, &TypeExpr) {
    let mut layers = Vec::new();
    let mut current = expr;
    loop {
        current = match current {
            TypeExpr::Pointer(inner) => {
                layers.push(ExprLayer::Pointer);
                inner
            }
            TypeExpr::Slice(inner) => {
                layers.push(ExprLayer::Slice);
                inner
            }
            TypeExpr::Array { len, elem } => {
                layers.push(ExprLayer::Array(len));
                elem
            }
            TypeExpr::Map { key, value } => {
                layers.push(ExprLayer::Map(key));
                value
            }
            TypeExpr::Chan(inner) => {
                layers.push(ExprLayer::Chan);
                inner
            }
            TypeExpr::Named { .. } | TypeExpr::Opaque(_) => return (layers, current),
        };
    }
}

/// Resolves type references against a `PackageProvider`.
pub struct SymbolResolver<'a> {
    provider: &'a dyn PackageProvider,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(provider: &'a dyn PackageProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &'a dyn PackageProvider {
        self.provider
    }

    /// Resolve the innermost type of an unwrapped expression.
    ///
    /// `package_path` is the import path of the package `file` belongs to.
    /// Errors are package-load failures; a name that simply does not exist
    /// is `Resolution::Unresolved`.
    pub fn resolve_base(
        &self,
        file: &SourceFile,
        package_path: &str,
        base: &TypeExpr,
    ) -> Result<Resolution, AnalysisError> {
        match base {
            TypeExpr::Named { qualifier, name } => {
                self.resolve_name(file, package_path, qualifier.as_deref(), name)
            }
            TypeExpr::Opaque(text) if is_empty_interface(text) => {
                Ok(Resolution::Universe("any"))
            }
            TypeExpr::Opaque(text) => Ok(Resolution::Opaque(text.clone())),
            other => Ok(Resolution::Unresolved {
                reason: format!("'{}' is not a named type", other),
            }),
        }
    }

    pub fn resolve_name(
        &self,
        file: &SourceFile,
        package_path: &str,
        qualifier: Option<&str>,
        name: &str,
    ) -> Result<Resolution, AnalysisError> {
        trace!(file = %file.path.display(), ?qualifier, type_name = name, "resolving type");
        match qualifier {
            Some(q) => self.resolve_qualified(file, q, name),
            None => self.resolve_unqualified(file, package_path, name),
        }
    }

    fn resolve_qualified(
        &self,
        file: &SourceFile,
        qualifier: &str,
        name: &str,
    ) -> Result<Resolution, AnalysisError> {
        let Some(import) = self.find_import(file, qualifier)? else {
            return Ok(Resolution::Unresolved {
                reason: format!("no import named '{}' in {}", qualifier, file.path.display()),
            });
        };

        if self.provider.origin(&import.path) == PackageOrigin::Standard {
            return Ok(Resolution::Special {
                package_path: import.path.clone(),
                package_name: import.default_name(),
                name: name.to_string(),
                import_kind: import.kind,
            });
        }

        let package = self.provider.package(&import.path)?;
        Ok(declared_in(&package, name, import.kind).unwrap_or_else(|| {
            Resolution::Unresolved {
                reason: format!("type not found in package '{}'", package.import_path),
            }
        }))
    }

    fn resolve_unqualified(
        &self,
        file: &SourceFile,
        package_path: &str,
        name: &str,
    ) -> Result<Resolution, AnalysisError> {
        for import in file.dot_imports() {
            if self.provider.origin(&import.path) == PackageOrigin::Standard {
                continue;
            }
            let package = self.provider.package(&import.path)?;
            if let Some(found) = declared_in(&package, name, ImportKind::Dot) {
                return Ok(found);
            }
        }

        let local = self.provider.package(package_path)?;
        if let Some(found) = declared_in(&local, name, ImportKind::Local) {
            return Ok(found);
        }

        if let Some(builtin) = universe::lookup(name) {
            return Ok(Resolution::Universe(builtin));
        }

        Ok(Resolution::Unresolved {
            reason: format!("not declared in package '{}'", package_path),
        })
    }

    /// Find the import a qualifier refers to. The last path segment is the
    /// usual package name; when no import matches that way, local imports
    /// are loaded and matched on their package clause.
    fn find_import<'f>(
        &self,
        file: &'f SourceFile,
        qualifier: &str,
    ) -> Result<Option<&'f Import>, AnalysisError> {
        if let Some(import) = file.import_by_name(qualifier) {
            return Ok(Some(import));
        }
        for import in &file.imports {
            if import.kind != ImportKind::Plain
                || self.provider.origin(&import.path) != PackageOrigin::Local
            {
                continue;
            }
            if self.provider.package(&import.path)?.name == qualifier {
                return Ok(Some(import));
            }
        }
        Ok(None)
    }
}

fn declared_in(package: &Arc<Package>, name: &str, import_kind: ImportKind) -> Option<Resolution> {
    let (file, decl) = package.find_type(name)?;
    Some(Resolution::Declared(ResolvedDecl {
        id: DeclId::new(package.import_path.clone(), name),
        package: Arc::clone(package),
        file: Arc::clone(file),
        decl: decl.clone(),
        import_kind,
    }))
}

fn is_empty_interface(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact == "interface{}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisContext;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com/shop\n");
        write(
            temp.path(),
            "models/user.go",
            "package models\n\ntype User struct {\n\tName string\n}\n",
        );
        write(
            temp.path(),
            "dto/types.go",
            "package payloads\n\ntype Page struct {\n\tSize int\n}\n",
        );
        write(
            temp.path(),
            "api/handler.go",
            r#"package api

import (
	"time"
	m "example.com/shop/models"
	"example.com/shop/dto"
	. "example.com/shop/models"
	"github.com/google/uuid"
)

type Local struct{}
"#,
        );
        temp
    }

    fn handler(ctx: &AnalysisContext, root: &Path) -> Arc<SourceFile> {
        ctx.analyze_file(&root.join("api/handler.go")).unwrap()
    }

    #[test]
    fn test_unwrap_containers() {
        let expr = TypeExpr::Pointer(Box::new(TypeExpr::Map {
            key: Box::new(TypeExpr::named("string")),
            value: Box::new(TypeExpr::Slice(Box::new(TypeExpr::qualified("m", "User")))),
        }));
        let (layers, base) = unwrap_containers(&expr);
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0], ExprLayer::Pointer);
        assert!(matches!(layers[1], ExprLayer::Map(_)));
        assert_eq!(layers[2], ExprLayer::Slice);
        assert_eq!(base, &TypeExpr::qualified("m", "User"));
    }

    #[test]
    fn test_resolve_kinds() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let file = handler(&ctx, temp.path());
        let resolver = SymbolResolver::new(&ctx);
        let pkg = "example.com/shop/api";

        match resolver.resolve_name(&file, pkg, Some("m"), "User").unwrap() {
            Resolution::Declared(d) => {
                assert_eq!(d.id, DeclId::new("example.com/shop/models", "User"));
                assert_eq!(d.import_kind, ImportKind::Aliased);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Dot import
        match resolver.resolve_name(&file, pkg, None, "User").unwrap() {
            Resolution::Declared(d) => assert_eq!(d.import_kind, ImportKind::Dot),
            other => panic!("unexpected {:?}", other),
        }

        // Package name differs from the directory name
        match resolver.resolve_name(&file, pkg, Some("payloads"), "Page").unwrap() {
            Resolution::Declared(d) => {
                assert_eq!(d.id.package, "example.com/shop/dto");
                assert_eq!(d.import_kind, ImportKind::Plain);
            }
            other => panic!("unexpected {:?}", other),
        }

        match resolver.resolve_name(&file, pkg, None, "Local").unwrap() {
            Resolution::Declared(d) => assert_eq!(d.import_kind, ImportKind::Local),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            resolver.resolve_name(&file, pkg, None, "string").unwrap(),
            Resolution::Universe("string")
        ));

        match resolver.resolve_name(&file, pkg, Some("time"), "Time").unwrap() {
            Resolution::Special {
                package_path, name, ..
            } => {
                assert_eq!(package_path, "time");
                assert_eq!(name, "Time");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            resolver.resolve_name(&file, pkg, None, "Missing").unwrap(),
            Resolution::Unresolved { .. }
        ));
        assert!(matches!(
            resolver.resolve_name(&file, pkg, Some("nope"), "X").unwrap(),
            Resolution::Unresolved { .. }
        ));
    }

    #[test]
    fn test_external_package_is_fatal() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let file = handler(&ctx, temp.path());
        let resolver = SymbolResolver::new(&ctx);

        let err = resolver
            .resolve_name(&file, "example.com/shop/api", Some("uuid"), "UUID")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::PackageLoad { .. }));
    }

    #[test]
    fn test_empty_interface_is_any() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let file = handler(&ctx, temp.path());
        let resolver = SymbolResolver::new(&ctx);
        assert!(matches!(
            resolver
                .resolve_base(&file, "example.com/shop/api", &TypeExpr::Opaque("interface{ }".into()))
                .unwrap(),
            Resolution::Universe("any")
        ));
        assert!(matches!(
            resolver
                .resolve_base(&file, "example.com/shop/api", &TypeExpr::Opaque("func()".into()))
                .unwrap(),
            Resolution::Opaque(_)
        ));
    }
}

//! Packages and the provider seam used by the resolver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{ConstDecl, MethodDecl, SourceFile, TypeDecl, TypeExpr};
use crate::error::AnalysisError;

/// Where an import path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOrigin {
    /// Inside the analyzed module; loadable from source.
    Local,
    /// Go standard library; never loaded.
    Standard,
    /// Third-party module outside the analyzed tree.
    External,
}

/// All non-test files of one Go package directory.
#[derive(Debug)]
pub struct Package {
    pub import_path: String,
    /// Package clause name.
    pub name: String,
    pub dir: PathBuf,
    /// Files sorted by path.
    pub files: Vec<Arc<SourceFile>>,
}

impl Package {
    pub fn find_type(&self, name: &str) -> Option<(&Arc<SourceFile>, &TypeDecl)> {
        self.files
            .iter()
            .find_map(|file| file.find_type(name).map(|decl| (file, decl)))
    }

    /// Methods on `receiver` across the package, in file then source order.
    pub fn methods_of(&self, receiver: &str) -> Vec<(&Arc<SourceFile>, &MethodDecl)> {
        self.files
            .iter()
            .flat_map(|file| {
                file.methods
                    .iter()
                    .filter(|m| m.receiver == receiver)
                    .map(move |m| (file, m))
            })
            .collect()
    }

    /// Constants declared with the named local type, in file then source
    /// order.
    pub fn consts_of_type(&self, type_name: &str) -> Vec<&ConstDecl> {
        self.files
            .iter()
            .flat_map(|file| file.consts.iter())
            .filter(|c| {
                matches!(
                    &c.ty,
                    Some(TypeExpr::Named { qualifier: None, name }) if name == type_name
                )
            })
            .collect()
    }
}

/// Lazily loads packages by import path.
///
/// Implementations must be safe to call from several resolver threads and
/// should memoize: the same import path is requested many times per build.
pub trait PackageProvider: Send + Sync {
    /// Classify an import path without loading it.
    fn origin(&self, import_path: &str) -> PackageOrigin;

    /// Load a local package. Standard and external paths are errors.
    fn package(&self, import_path: &str) -> Result<Arc<Package>, AnalysisError>;

    /// Import path of the package containing `file`.
    fn import_path_of(&self, file: &Path) -> String;
}

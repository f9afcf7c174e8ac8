//! Analysis context: cached file extraction and lazy package loading.
//!
//! The AnalysisContext provides:
//! - Caching of extracted files to avoid re-parsing
//! - Mapping between import paths and directories via `go.mod`
//! - Memoized package loading for the resolver

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analysis::{GoAnalyzer, Package, PackageOrigin, PackageProvider, SourceFile};
use crate::cache::FileVersion;
use crate::config::PathFilter;
use crate::error::AnalysisError;

/// Directories never descended into while collecting sources.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

/// Analysis context for one project root.
///
/// Safe to share across threads; all caches sit behind `RwLock`s.
pub struct AnalysisContext {
    root: PathBuf,
    /// Module path from `go.mod`, or the root directory name without one.
    module_path: String,
    analyzer: GoAnalyzer,
    files: RwLock<HashMap<PathBuf, Arc<SourceFile>>>,
    packages: RwLock<HashMap<String, Arc<Package>>>,
}

impl AnalysisContext {
    /// Create a new analysis context rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let module_path = read_module_path(&root).unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "main".to_string())
        });
        debug!(root = %root.display(), module = %module_path, "created analysis context");
        Self {
            root,
            module_path,
            analyzer: GoAnalyzer::new(),
            files: RwLock::new(HashMap::new()),
            packages: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// Import path of the package in `dir`.
    pub fn import_path_for(&self, dir: &Path) -> String {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if segments.is_empty() {
            self.module_path.clone()
        } else {
            format!("{}/{}", self.module_path, segments.join("/"))
        }
    }

    /// Directory of a module-local import path.
    pub fn dir_for(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.module_path {
            return Some(self.root.clone());
        }
        let rest = import_path.strip_prefix(&self.module_path)?.strip_prefix('/')?;
        Some(rest.split('/').fold(self.root.clone(), |dir, s| dir.join(s)))
    }

    /// Extract a file, returning the cached result if already analyzed.
    pub fn analyze_file(&self, path: &Path) -> Result<Arc<SourceFile>, AnalysisError> {
        if let Some(file) = self.files.read().ok().and_then(|f| f.get(path).cloned()) {
            return Ok(file);
        }

        let source = fs::read(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = self.analyzer.analyze(path, &source)?;
        if file.has_parse_errors {
            warn!(file = %path.display(), "file has syntax errors, using recovered declarations");
        }
        file.version = match FileVersion::from_read(path, &source) {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot fingerprint file");
                None
            }
        };

        let file = Arc::new(file);
        if let Ok(mut files) = self.files.write() {
            files.insert(path.to_path_buf(), Arc::clone(&file));
        }
        Ok(file)
    }

    /// Analyze files in parallel, skipping (and logging) failures. Results
    /// are sorted by path.
    pub fn analyze_files_parallel(&self, paths: &[PathBuf]) -> Vec<Arc<SourceFile>> {
        let results: Vec<_> = paths.par_iter().map(|p| self.analyze_file(p)).collect();

        let mut files = Vec::new();
        for result in results {
            match result {
                Ok(file) => files.push(file),
                Err(e) => warn!(error = %e, "failed to analyze file"),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// All Go source files under the root accepted by `filter`, sorted.
    pub fn collect_files(&self, filter: &PathFilter) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_go_source(entry.path()))
            .filter(|entry| {
                let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
                filter.matches(relative)
            })
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        paths
    }

    /// Collect and extract every matching source file.
    pub fn scan(&self, filter: &PathFilter) -> Vec<Arc<SourceFile>> {
        let paths = self.collect_files(filter);
        debug!(count = paths.len(), "collected source files");
        self.analyze_files_parallel(&paths)
    }

    fn load_package(&self, import_path: &str) -> Result<Package, AnalysisError> {
        let load_error = |reason: String| AnalysisError::PackageLoad {
            import_path: import_path.to_string(),
            reason,
        };

        let dir = self
            .dir_for(import_path)
            .ok_or_else(|| load_error(format!("not inside module '{}'", self.module_path)))?;
        let entries = fs::read_dir(&dir)
            .map_err(|e| load_error(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_go_source(path))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(load_error(format!("no Go files in {}", dir.display())));
        }

        let results: Vec<_> = paths.par_iter().map(|p| self.analyze_file(p)).collect();
        let mut files = Vec::with_capacity(results.len());
        for result in results {
            files.push(result.map_err(|e| load_error(e.to_string()))?);
        }

        let mut names: Vec<&str> = files.iter().map(|f| f.package.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        let name = match names.as_slice() {
            [single] => single.to_string(),
            _ => {
                return Err(load_error(format!(
                    "found multiple packages: {}",
                    names.join(", ")
                )))
            }
        };

        debug!(package = %import_path, files = files.len(), "loaded package");
        Ok(Package {
            import_path: import_path.to_string(),
            name,
            dir,
            files,
        })
    }
}

impl PackageProvider for AnalysisContext {
    fn origin(&self, import_path: &str) -> PackageOrigin {
        if import_path == self.module_path
            || import_path
                .strip_prefix(&self.module_path)
                .is_some_and(|rest| rest.starts_with('/'))
        {
            return PackageOrigin::Local;
        }
        let first = import_path.split('/').next().unwrap_or(import_path);
        if first.contains('.') {
            PackageOrigin::External
        } else {
            PackageOrigin::Standard
        }
    }

    fn package(&self, import_path: &str) -> Result<Arc<Package>, AnalysisError> {
        if let Some(pkg) = self
            .packages
            .read()
            .ok()
            .and_then(|p| p.get(import_path).cloned())
        {
            return Ok(pkg);
        }

        match self.origin(import_path) {
            PackageOrigin::Local => {}
            PackageOrigin::Standard => {
                return Err(AnalysisError::PackageLoad {
                    import_path: import_path.to_string(),
                    reason: "standard library packages are not loaded".to_string(),
                })
            }
            PackageOrigin::External => {
                return Err(AnalysisError::PackageLoad {
                    import_path: import_path.to_string(),
                    reason: format!("outside module '{}'", self.module_path),
                })
            }
        }

        let package = Arc::new(self.load_package(import_path)?);
        if let Ok(mut packages) = self.packages.write() {
            let entry = packages
                .entry(import_path.to_string())
                .or_insert_with(|| Arc::clone(&package));
            return Ok(Arc::clone(entry));
        }
        Ok(package)
    }

    fn import_path_of(&self, file: &Path) -> String {
        self.import_path_for(file.parent().unwrap_or(&self.root))
    }
}

/// Module path declared in `root/go.mod`.
fn read_module_path(root: &Path) -> Option<String> {
    let content = fs::read_to_string(root.join("go.mod")).ok()?;
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn is_go_source(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".go") && !name.ends_with("_test.go")
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com/shop\n\ngo 1.22\n");
        write(temp.path(), "main.go", "package main\n");
        write(
            temp.path(),
            "models/user.go",
            "package models\n\ntype User struct {\n\tName string\n}\n",
        );
        write(
            temp.path(),
            "models/role.go",
            "package models\n\ntype Role string\n\nconst RoleAdmin Role = \"admin\"\n",
        );
        write(temp.path(), "models/user_test.go", "package models\n");
        write(temp.path(), "vendor/x/x.go", "package x\n");
        write(temp.path(), ".git/hooks/h.go", "package h\n");
        temp
    }

    #[test]
    fn test_module_path_and_import_mapping() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        assert_eq!(ctx.module_path(), "example.com/shop");
        assert_eq!(
            ctx.import_path_for(&temp.path().join("models")),
            "example.com/shop/models"
        );
        assert_eq!(ctx.import_path_for(temp.path()), "example.com/shop");
        assert_eq!(
            ctx.dir_for("example.com/shop/models"),
            Some(temp.path().join("models"))
        );
        assert_eq!(ctx.dir_for("example.com/shopping"), None);
    }

    #[test]
    fn test_origin() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        assert_eq!(ctx.origin("example.com/shop/models"), PackageOrigin::Local);
        assert_eq!(ctx.origin("context"), PackageOrigin::Standard);
        assert_eq!(ctx.origin("net/http"), PackageOrigin::Standard);
        assert_eq!(ctx.origin("github.com/google/uuid"), PackageOrigin::External);
    }

    #[test]
    fn test_collect_files_skips_tests_vendor_and_hidden() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let filter = Config::default().path_filter().unwrap();
        let files: Vec<_> = ctx
            .collect_files(&filter)
            .into_iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("main.go"),
                PathBuf::from("models/role.go"),
                PathBuf::from("models/user.go"),
            ]
        );
    }

    #[test]
    fn test_load_package() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let pkg = ctx.package("example.com/shop/models").unwrap();
        assert_eq!(pkg.name, "models");
        assert_eq!(pkg.files.len(), 2);
        assert!(pkg.find_type("User").is_some());
        assert_eq!(pkg.consts_of_type("Role").len(), 1);
        assert!(pkg.files.iter().all(|f| f.version.is_some()));

        // Memoized
        let again = ctx.package("example.com/shop/models").unwrap();
        assert!(Arc::ptr_eq(&pkg, &again));
    }

    #[test]
    fn test_load_package_failures() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        assert!(matches!(
            ctx.package("github.com/google/uuid"),
            Err(AnalysisError::PackageLoad { .. })
        ));
        assert!(matches!(
            ctx.package("example.com/shop/missing"),
            Err(AnalysisError::PackageLoad { .. })
        ));
        assert!(matches!(
            ctx.package("time"),
            Err(AnalysisError::PackageLoad { .. })
        ));
    }

    #[test]
    fn test_methods_of_spans_files() {
        let temp = project();
        write(
            temp.path(),
            "models/user_methods.go",
            "package models\n\nfunc (u *User) Rename(name string) {}\n\nfunc (r Role) Valid() bool { return true }\n\nfunc (u User) Display() string { return u.Name }\n",
        );
        let ctx = AnalysisContext::new(temp.path());
        let pkg = ctx.package("example.com/shop/models").unwrap();

        let receiver = String::from("User");
        let names: Vec<_> = pkg
            .methods_of(&receiver)
            .into_iter()
            .map(|(_, m)| m.name.clone())
            .collect();
        assert_eq!(names, vec!["Rename", "Display"]);
        assert!(pkg.methods_of("Missing").is_empty());
    }

    #[test]
    fn test_analyze_file_is_cached() {
        let temp = project();
        let ctx = AnalysisContext::new(temp.path());
        let path = temp.path().join("models/user.go");
        let first = ctx.analyze_file(&path).unwrap();
        let second = ctx.analyze_file(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.package, "models");
    }
}

//! Analyzer configuration.
//!
//! Loaded from `routescan.yaml` (or `.routescan.yaml`) at the project root,
//! or from an explicit path. Every field has a default, so an empty file
//! and no file at all behave the same.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// File names probed by [`Config::discover`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["routescan.yaml", ".routescan.yaml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Glob patterns (relative to the root) of files to analyze.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Glob patterns of files to skip, e.g. "**/mocks/**".
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Embedded type name that marks a struct as a controller.
    #[serde(default = "default_controller_marker")]
    pub controller_marker: String,
    /// Struct names treated as structured error payloads.
    #[serde(default = "default_structured_error_types")]
    pub structured_error_types: Vec<String>,
    /// Drop `@Hidden` routes from the flattened output.
    #[serde(default)]
    pub exclude_hidden_routes: bool,
    /// Content type assumed for routes without `@ContentType`.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

fn default_include() -> Vec<String> {
    vec!["**/*.go".to_string()]
}

fn default_controller_marker() -> String {
    "ControllerBase".to_string()
}

fn default_structured_error_types() -> Vec<String> {
    vec!["Rfc7807Error".to_string()]
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: Vec::new(),
            controller_marker: default_controller_marker(),
            structured_error_types: default_structured_error_types(),
            exclude_hidden_routes: false,
            default_content_type: default_content_type(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        validate(&config)?;
        Ok(config)
    }

    /// Find a config file in `root`.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Load the explicit config if given, else a discovered one, else the
    /// defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(root)) {
            Some(path) => Self::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e)),
            None => Ok(Self::default()),
        }
    }

    /// Compile the include/exclude globs.
    pub fn path_filter(&self) -> Result<PathFilter, AnalysisError> {
        Ok(PathFilter {
            include: build_globset(&self.include)?,
            exclude: build_globset(&self.exclude)?,
        })
    }

    /// Whether a struct with this name is a structured error payload.
    pub fn is_structured_error(&self, type_name: &str) -> bool {
        self.structured_error_types.iter().any(|t| t == type_name)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| AnalysisError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| AnalysisError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Compiled include/exclude globs, matched against root-relative paths.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.controller_marker.trim().is_empty() {
        anyhow::bail!("controller_marker must not be empty");
    }
    if config.include.is_empty() {
        anyhow::bail!("include must list at least one pattern");
    }
    for pattern in config.include.iter().chain(&config.exclude) {
        Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid glob pattern {:?}: {}", pattern, e))?;
    }
    Ok(())
}

//! Error types for graph construction and the analysis pipeline.
//!
//! Three tiers:
//! - `AnalysisError`: a single build-breaking failure (package load, parse,
//!   unresolvable type), wrapped with declaration context as it propagates.
//! - `BuildFailure`: every fatal error recorded during one graph walk.
//! - `ValidationFailure`: the aggregate reported when diagnostics contain
//!   at least one error.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::DiagnosticEntity;

/// A fatal failure while loading, parsing or resolving declarations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to load package '{import_path}': {reason}")]
    PackageLoad { import_path: String, reason: String },

    #[error("cannot resolve type '{name}': {reason}")]
    Unresolved { name: String, reason: String },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("malformed declaration '{name}': {reason}")]
    MalformedDeclaration { name: String, reason: String },

    #[error("{entity}: {source}")]
    Context {
        entity: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Wrap this error with the identity of the declaration being processed.
    pub fn context(self, entity: impl Into<String>) -> Self {
        AnalysisError::Context {
            entity: entity.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root_cause(&self) -> &AnalysisError {
        match self {
            AnalysisError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Every fatal error recorded while walking declarations.
#[derive(Debug, Error)]
#[error("graph build failed with {} error(s); last error: {}", errors.len(), last_message(errors))]
pub struct BuildFailure {
    errors: Vec<AnalysisError>,
}

fn last_message(errors: &[AnalysisError]) -> String {
    errors
        .last()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl BuildFailure {
    pub fn new(errors: Vec<AnalysisError>) -> Self {
        Self { errors }
    }

    pub fn first(&self) -> Option<&AnalysisError> {
        self.errors.first()
    }

    pub fn last(&self) -> Option<&AnalysisError> {
        self.errors.last()
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    /// The recorded errors in walk order, one formatted line each.
    pub fn diagnostic_stack(&self) -> Vec<String> {
        self.errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("#{} {}", i + 1, e))
            .collect()
    }
}

/// Raised when validation produced at least one error-severity diagnostic.
#[derive(Debug, Error)]
#[error("{summary}")]
pub struct ValidationFailure {
    summary: String,
    error_count: usize,
}

impl ValidationFailure {
    /// Build the aggregate from a diagnostics tree. Returns `None` when the
    /// tree contains no error-severity diagnostic.
    pub fn from_entities(entities: &[DiagnosticEntity]) -> Option<Self> {
        let error_count: usize = entities.iter().map(|e| e.classify().errors.len()).sum();
        if error_count == 0 {
            return None;
        }

        let mut summary = format!("validation failed with {} error(s)", error_count);
        for entity in entities {
            write_entity(&mut summary, entity, 1);
        }
        Some(Self {
            summary,
            error_count,
        })
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }
}

fn write_entity(out: &mut String, entity: &DiagnosticEntity, depth: usize) {
    let counts = entity.classify();
    if counts.total() == 0 {
        return;
    }
    let indent = "  ".repeat(depth);
    let _ = write!(
        out,
        "\n{}{} {}: {} error(s), {} warning(s), {} info, {} hint(s)",
        indent,
        entity.kind,
        entity.name,
        counts.errors.len(),
        counts.warnings.len(),
        counts.infos.len(),
        counts.hints.len()
    );
    for diag in &entity.diagnostics {
        let location = match &entity.file {
            Some(file) => format!("{}:{}", file.display(), diag.span),
            None => diag.span.to_string(),
        };
        let _ = write!(
            out,
            "\n{}  {}[{}] {}: {}",
            indent, diag.severity, diag.code, location, diag.message
        );
    }
    for child in &entity.children {
        write_entity(out, child, depth + 1);
    }
}

/// Failures surfaced by the pipeline entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Build(#[from] BuildFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("no graph has been generated yet")]
    NoGraph,
}

impl PipelineError {
    /// Whether this failure came from error-severity diagnostics rather than
    /// a broken build environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wrapping() {
        let err = AnalysisError::Unresolved {
            name: "models.User".to_string(),
            reason: "type not found".to_string(),
        }
        .context("parameter 'user'")
        .context("route UsersController.Create");

        assert_eq!(
            err.to_string(),
            "route UsersController.Create: parameter 'user': cannot resolve type 'models.User': type not found"
        );
        assert!(matches!(err.root_cause(), AnalysisError::Unresolved { .. }));
    }

    #[test]
    fn test_build_failure_stack() {
        let failure = BuildFailure::new(vec![
            AnalysisError::PackageLoad {
                import_path: "example.com/missing".to_string(),
                reason: "not in module".to_string(),
            },
            AnalysisError::MalformedDeclaration {
                name: "Broken".to_string(),
                reason: "no receiver".to_string(),
            },
        ]);

        assert!(matches!(failure.first(), Some(AnalysisError::PackageLoad { .. })));
        assert!(matches!(
            failure.last(),
            Some(AnalysisError::MalformedDeclaration { .. })
        ));
        let stack = failure.diagnostic_stack();
        assert_eq!(stack.len(), 2);
        assert!(stack[0].starts_with("#1 failed to load package"));
        assert!(failure.to_string().contains("2 error(s)"));
        assert!(failure.to_string().contains("malformed declaration 'Broken'"));
    }
}

//! Core types for validation results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::Span;

/// Severity levels for diagnostics, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "hint" => Ok(Severity::Hint),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Stable identifiers for every diagnostic the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    // Annotation blocks
    MalformedAnnotation,
    DuplicateAnnotation,
    AnnotationNotApplicable,
    UnknownAnnotation,
    // Controllers
    MissingTag,
    ControllerNoRoutes,
    // Routes
    MissingMethod,
    InvalidHttpVerb,
    MissingRoute,
    NonStandardStatusCode,
    InvalidStatusCode,
    InvalidReturnSignature,
    MissingDescription,
    DeprecatedRoute,
    // Parameter linkage
    UnreferencedParameter,
    MissingPathReference,
    UnknownParameterReference,
    DuplicateParameterReference,
    PathParameterNotInRoute,
    MultipleBodyParameters,
    BodyOnReadVerb,
    // Types
    InterfaceTypeReference,
    OpaqueTypeReference,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedAnnotation => "malformed-annotation",
            DiagnosticCode::DuplicateAnnotation => "duplicate-annotation",
            DiagnosticCode::AnnotationNotApplicable => "annotation-not-applicable",
            DiagnosticCode::UnknownAnnotation => "unknown-annotation",
            DiagnosticCode::MissingTag => "missing-tag",
            DiagnosticCode::ControllerNoRoutes => "controller-no-routes",
            DiagnosticCode::MissingMethod => "missing-method",
            DiagnosticCode::InvalidHttpVerb => "invalid-http-verb",
            DiagnosticCode::MissingRoute => "missing-route",
            DiagnosticCode::NonStandardStatusCode => "non-standard-status-code",
            DiagnosticCode::InvalidStatusCode => "invalid-status-code",
            DiagnosticCode::InvalidReturnSignature => "invalid-return-signature",
            DiagnosticCode::MissingDescription => "missing-description",
            DiagnosticCode::DeprecatedRoute => "deprecated-route",
            DiagnosticCode::UnreferencedParameter => "unreferenced-parameter",
            DiagnosticCode::MissingPathReference => "missing-path-reference",
            DiagnosticCode::UnknownParameterReference => "unknown-parameter-reference",
            DiagnosticCode::DuplicateParameterReference => "duplicate-parameter-reference",
            DiagnosticCode::PathParameterNotInRoute => "path-parameter-not-in-route",
            DiagnosticCode::MultipleBodyParameters => "multiple-body-parameters",
            DiagnosticCode::BodyOnReadVerb => "body-on-read-verb",
            DiagnosticCode::InterfaceTypeReference => "interface-type-reference",
            DiagnosticCode::OpaqueTypeReference => "opaque-type-reference",
        }
    }

    /// The severity every diagnostic with this code is reported at.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::MalformedAnnotation
            | DiagnosticCode::DuplicateAnnotation
            | DiagnosticCode::MissingMethod
            | DiagnosticCode::InvalidHttpVerb
            | DiagnosticCode::MissingRoute
            | DiagnosticCode::InvalidStatusCode
            | DiagnosticCode::InvalidReturnSignature
            | DiagnosticCode::UnreferencedParameter
            | DiagnosticCode::MissingPathReference
            | DiagnosticCode::UnknownParameterReference
            | DiagnosticCode::DuplicateParameterReference
            | DiagnosticCode::PathParameterNotInRoute
            | DiagnosticCode::MultipleBodyParameters => Severity::Error,
            DiagnosticCode::AnnotationNotApplicable
            | DiagnosticCode::MissingTag
            | DiagnosticCode::NonStandardStatusCode
            | DiagnosticCode::BodyOnReadVerb
            | DiagnosticCode::InterfaceTypeReference
            | DiagnosticCode::OpaqueTypeReference => Severity::Warning,
            DiagnosticCode::ControllerNoRoutes | DiagnosticCode::DeprecatedRoute => Severity::Info,
            DiagnosticCode::UnknownAnnotation | DiagnosticCode::MissingDescription => {
                Severity::Hint
            }
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single finding attached to a source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub span: Span,
}

impl Diagnostic {
    /// A diagnostic at the code's standard severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            severity: code.severity(),
            code,
            span,
        }
    }
}

/// Kinds of entity a diagnostics node can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Controller,
    Route,
    Parameter,
    ReturnValue,
    Struct,
    Enum,
    Alias,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Controller => "controller",
            EntityKind::Route => "route",
            EntityKind::Parameter => "parameter",
            EntityKind::ReturnValue => "return",
            EntityKind::Struct => "struct",
            EntityKind::Enum => "enum",
            EntityKind::Alias => "alias",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostics for one entity, nested like the controller -> route tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEntity {
    pub kind: EntityKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DiagnosticEntity>,
}

impl DiagnosticEntity {
    pub fn new(kind: EntityKind, name: impl Into<String>, file: Option<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
            file,
            diagnostics: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Collect this entity's diagnostics and all its descendants', grouped
    /// by severity.
    pub fn classify(&self) -> ClassifiedDiagnostics<'_> {
        let mut out = ClassifiedDiagnostics::default();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut ClassifiedDiagnostics<'a>) {
        for diag in &self.diagnostics {
            match diag.severity {
                Severity::Error => out.errors.push(diag),
                Severity::Warning => out.warnings.push(diag),
                Severity::Info => out.infos.push(diag),
                Severity::Hint => out.hints.push(diag),
            }
        }
        for child in &self.children {
            child.collect_into(out);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
            || self.children.iter().any(|c| c.has_errors())
    }

    /// Depth-first search for a descendant (or self) by kind and name.
    pub fn find(&self, kind: EntityKind, name: &str) -> Option<&DiagnosticEntity> {
        if self.kind == kind && self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(kind, name))
    }
}

/// Diagnostics of a subtree grouped by severity.
#[derive(Debug, Default)]
pub struct ClassifiedDiagnostics<'a> {
    pub errors: Vec<&'a Diagnostic>,
    pub warnings: Vec<&'a Diagnostic>,
    pub infos: Vec<&'a Diagnostic>,
    pub hints: Vec<&'a Diagnostic>,
}

impl ClassifiedDiagnostics<'_> {
    pub fn total(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.infos.len() + self.hints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_severity() {
        assert_eq!(
            DiagnosticCode::MissingPathReference.severity(),
            Severity::Error
        );
        assert_eq!(
            DiagnosticCode::NonStandardStatusCode.severity(),
            Severity::Warning
        );
        assert_eq!(DiagnosticCode::DeprecatedRoute.severity(), Severity::Info);
        assert_eq!(DiagnosticCode::MissingDescription.severity(), Severity::Hint);
    }

    #[test]
    fn test_code_serializes_kebab_case() {
        let json = serde_json::to_string(&DiagnosticCode::UnreferencedParameter).unwrap();
        assert_eq!(json, "\"unreferenced-parameter\"");
        assert_eq!(
            DiagnosticCode::UnreferencedParameter.as_str(),
            "unreferenced-parameter"
        );
    }

    #[test]
    fn test_classify_nested() {
        let mut route = DiagnosticEntity::new(EntityKind::Route, "UsersController.Get", None);
        route.diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingDescription,
            "route has no description",
            Span::default(),
        ));
        route.diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingPathReference,
            "path parameter {id} is not bound",
            Span::default(),
        ));

        let mut controller =
            DiagnosticEntity::new(EntityKind::Controller, "UsersController", None);
        controller.diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingTag,
            "controller has no @Tag",
            Span::default(),
        ));
        controller.children.push(route);

        let classified = controller.classify();
        assert_eq!(classified.errors.len(), 1);
        assert_eq!(classified.warnings.len(), 1);
        assert_eq!(classified.hints.len(), 1);
        assert_eq!(classified.total(), 3);
        assert!(controller.has_errors());
        assert!(controller
            .find(EntityKind::Route, "UsersController.Get")
            .is_some());
    }
}

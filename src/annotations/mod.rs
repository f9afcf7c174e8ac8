//! Structured annotations embedded in doc comments.
//!
//! An annotation line has the form `@Kind(value, {options}) description`.
//! The argument list and the description are both optional; lines that do
//! not start with `@` contribute to the free-text description.

mod parser;

pub use parser::{parse_annotations, parse_text};

use std::fmt;

use serde_json::{Map, Value};

use crate::analysis::Span;
use crate::diagnostics::Diagnostic;
use crate::metadata::ParamLocation;

/// Closed set of annotation kinds, plus a passthrough for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Tag,
    Route,
    Method,
    Query,
    Path,
    Header,
    Body,
    FormField,
    Security,
    Response,
    ErrorResponse,
    Description,
    Deprecated,
    Hidden,
    ContentType,
    Unknown { keyword: String },
}

/// Declarations that can carry annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationHolder {
    Controller,
    Route,
    Model,
    Field,
}

impl fmt::Display for AnnotationHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationHolder::Controller => "controller",
            AnnotationHolder::Route => "route",
            AnnotationHolder::Model => "type",
            AnnotationHolder::Field => "field",
        };
        write!(f, "{}", name)
    }
}

/// Whether a kind takes a positional value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueArity {
    Required,
    Optional,
    None,
    /// One or more comma-separated values.
    List,
}

impl AnnotationKind {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "Tag" => AnnotationKind::Tag,
            "Route" => AnnotationKind::Route,
            "Method" => AnnotationKind::Method,
            "Query" => AnnotationKind::Query,
            "Path" => AnnotationKind::Path,
            "Header" => AnnotationKind::Header,
            "Body" => AnnotationKind::Body,
            "FormField" => AnnotationKind::FormField,
            "Security" => AnnotationKind::Security,
            "Response" => AnnotationKind::Response,
            "ErrorResponse" => AnnotationKind::ErrorResponse,
            "Description" => AnnotationKind::Description,
            "Deprecated" => AnnotationKind::Deprecated,
            "Hidden" => AnnotationKind::Hidden,
            "ContentType" => AnnotationKind::ContentType,
            other => AnnotationKind::Unknown {
                keyword: other.to_string(),
            },
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            AnnotationKind::Tag => "Tag",
            AnnotationKind::Route => "Route",
            AnnotationKind::Method => "Method",
            AnnotationKind::Query => "Query",
            AnnotationKind::Path => "Path",
            AnnotationKind::Header => "Header",
            AnnotationKind::Body => "Body",
            AnnotationKind::FormField => "FormField",
            AnnotationKind::Security => "Security",
            AnnotationKind::Response => "Response",
            AnnotationKind::ErrorResponse => "ErrorResponse",
            AnnotationKind::Description => "Description",
            AnnotationKind::Deprecated => "Deprecated",
            AnnotationKind::Hidden => "Hidden",
            AnnotationKind::ContentType => "ContentType",
            AnnotationKind::Unknown { keyword } => keyword,
        }
    }

    /// Kinds that may appear at most once per declaration.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Tag
                | AnnotationKind::Route
                | AnnotationKind::Method
                | AnnotationKind::Description
                | AnnotationKind::Deprecated
                | AnnotationKind::Hidden
                | AnnotationKind::ContentType
                | AnnotationKind::Body
        )
    }

    pub fn arity(&self) -> ValueArity {
        match self {
            AnnotationKind::Deprecated | AnnotationKind::Hidden => ValueArity::None,
            AnnotationKind::Description | AnnotationKind::Unknown { .. } => ValueArity::Optional,
            AnnotationKind::ContentType => ValueArity::List,
            _ => ValueArity::Required,
        }
    }

    /// The parameter location a kind binds, for location annotations.
    pub fn location(&self) -> Option<ParamLocation> {
        match self {
            AnnotationKind::Path => Some(ParamLocation::Path),
            AnnotationKind::Query => Some(ParamLocation::Query),
            AnnotationKind::Header => Some(ParamLocation::Header),
            AnnotationKind::Body => Some(ParamLocation::Body),
            AnnotationKind::FormField => Some(ParamLocation::Form),
            _ => None,
        }
    }

    pub fn applies_to(&self, holder: AnnotationHolder) -> bool {
        use AnnotationKind as K;
        match holder {
            AnnotationHolder::Controller => matches!(
                self,
                K::Tag
                    | K::Route
                    | K::Security
                    | K::Description
                    | K::Deprecated
                    | K::Hidden
                    | K::Unknown { .. }
            ),
            AnnotationHolder::Route => !matches!(self, K::Tag),
            AnnotationHolder::Model | AnnotationHolder::Field => {
                matches!(self, K::Description | K::Deprecated | K::Unknown { .. })
            }
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.keyword())
    }
}

/// One parsed annotation line.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Positional value with surrounding quotes removed.
    pub value: Option<String>,
    pub options: Map<String, Value>,
    /// Text following the argument list.
    pub description: String,
    /// Span of the whole annotation text.
    pub span: Span,
    /// Span of the positional value, when present.
    pub value_span: Option<Span>,
}

impl Annotation {
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// String entries of an array option; a single string is promoted.
    pub fn option_strings(&self, key: &str) -> Vec<String> {
        match self.options.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// The span diagnostics about the value should point at.
    pub fn value_or_span(&self) -> Span {
        self.value_span.unwrap_or(self.span)
    }
}

/// All annotations attached to one declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    pub annotations: Vec<Annotation>,
    /// Non-annotation comment lines, joined with newlines.
    pub text: String,
    /// Problems found while parsing the block.
    pub issues: Vec<Diagnostic>,
    /// Kinds named by lines that failed to parse.
    pub malformed: Vec<AnnotationKind>,
}

impl AnnotationSet {
    pub fn first(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.kind == kind)
    }

    pub fn all<'a>(&'a self, kind: &'a AnnotationKind) -> impl Iterator<Item = &'a Annotation> {
        self.annotations.iter().filter(move |a| &a.kind == kind)
    }

    pub fn has(&self, kind: &AnnotationKind) -> bool {
        self.first(kind).is_some()
    }

    pub fn has_malformed(&self, kind: &AnnotationKind) -> bool {
        self.malformed.contains(kind)
    }

    pub fn value(&self, kind: &AnnotationKind) -> Option<&str> {
        self.first(kind).and_then(|a| a.value.as_deref())
    }

    /// Whether the block carries any annotation at all.
    pub fn is_annotated(&self) -> bool {
        !self.annotations.is_empty() || !self.issues.is_empty()
    }

    /// `@Description` content if present, otherwise the free text.
    pub fn description(&self) -> String {
        if let Some(annotation) = self.first(&AnnotationKind::Description) {
            let parts: Vec<&str> = annotation
                .value
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(annotation.description.as_str()))
                .filter(|s| !s.is_empty())
                .collect();
            return parts.join(" ");
        }
        self.text.clone()
    }

    /// Annotations that bind a method parameter to a request location.
    pub fn locations(&self) -> impl Iterator<Item = (ParamLocation, &Annotation)> {
        self.annotations
            .iter()
            .filter_map(|a| a.kind.location().map(|loc| (loc, a)))
    }
}

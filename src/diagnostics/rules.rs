//! Validation rules, one pure function per check.
//!
//! Each rule looks at a single entity (plus its already-resolved children)
//! and returns zero or more diagnostics. Rules share no state and run in
//! the order they are listed.

use phf::phf_set;

use super::{Diagnostic, DiagnosticCode};
use crate::analysis::Span;
use crate::annotations::{AnnotationHolder, AnnotationKind, AnnotationSet};
use crate::graph::{ControllerNode, ModelNode, ParamNode, ReturnNode, RouteNode};
use crate::metadata::{ParamLocation, SymbolKind, TypeMetadata};

/// Status codes registered with IANA.
static REGISTERED_STATUS_CODES: phf::Set<u16> = phf_set! {
    100u16, 101u16, 102u16, 103u16,
    200u16, 201u16, 202u16, 203u16, 204u16, 205u16, 206u16, 207u16, 208u16, 226u16,
    300u16, 301u16, 302u16, 303u16, 304u16, 305u16, 307u16, 308u16,
    400u16, 401u16, 402u16, 403u16, 404u16, 405u16, 406u16, 407u16, 408u16, 409u16,
    410u16, 411u16, 412u16, 413u16, 414u16, 415u16, 416u16, 417u16, 421u16, 422u16,
    423u16, 424u16, 425u16, 426u16, 428u16, 429u16, 431u16, 451u16,
    500u16, 501u16, 502u16, 503u16, 504u16, 505u16, 506u16, 507u16, 508u16, 510u16,
    511u16,
};

/// A controller and how many routes it ended up with.
pub struct ControllerView<'g> {
    pub node: &'g ControllerNode,
    pub route_count: usize,
}

/// A route with its parameters and return values in ordinal order.
pub struct RouteView<'g> {
    pub node: &'g RouteNode,
    pub params: Vec<&'g ParamNode>,
    pub returns: Vec<&'g ReturnNode>,
}

pub type ControllerRule = fn(&ControllerView<'_>) -> Vec<Diagnostic>;
pub type RouteRule = fn(&RouteView<'_>) -> Vec<Diagnostic>;
pub type ParamRule = fn(&ParamNode) -> Vec<Diagnostic>;
pub type ReturnRule = fn(&ReturnNode) -> Vec<Diagnostic>;
pub type ModelRule = fn(&ModelNode) -> Vec<Diagnostic>;

pub const CONTROLLER_RULES: &[ControllerRule] = &[
    controller_annotations,
    missing_tag,
    controller_no_routes,
];

pub const ROUTE_RULES: &[RouteRule] = &[
    route_annotations,
    missing_method,
    invalid_http_verb,
    missing_route,
    status_codes,
    path_linkage,
    multiple_body_parameters,
    body_on_read_verb,
    return_signature,
    missing_description,
    deprecated_route,
];

pub const PARAM_RULES: &[ParamRule] = &[unreferenced_parameter, param_type_reference];

pub const RETURN_RULES: &[ReturnRule] = &[return_type_reference];

pub const MODEL_RULES: &[ModelRule] = &[model_annotations, field_annotation_issues];

/// Parse problems, misplaced kinds and unknown keywords in one block.
fn annotation_issues(set: &AnnotationSet, holder: AnnotationHolder) -> Vec<Diagnostic> {
    let mut out = set.issues.clone();
    for annotation in &set.annotations {
        if let AnnotationKind::Unknown { keyword } = &annotation.kind {
            out.push(Diagnostic::new(
                DiagnosticCode::UnknownAnnotation,
                format!("unknown annotation '@{}' kept as text", keyword),
                annotation.span,
            ));
        } else if !annotation.kind.applies_to(holder) {
            out.push(Diagnostic::new(
                DiagnosticCode::AnnotationNotApplicable,
                format!("{} has no effect on a {}", annotation.kind, holder),
                annotation.span,
            ));
        }
    }
    out
}

fn controller_annotations(c: &ControllerView<'_>) -> Vec<Diagnostic> {
    annotation_issues(&c.node.annotations, AnnotationHolder::Controller)
}

fn route_annotations(r: &RouteView<'_>) -> Vec<Diagnostic> {
    annotation_issues(&r.node.annotations, AnnotationHolder::Route)
}

fn model_annotations(m: &ModelNode) -> Vec<Diagnostic> {
    annotation_issues(&m.annotations, AnnotationHolder::Model)
}

fn field_annotation_issues(model: &ModelNode) -> Vec<Diagnostic> {
    model
        .field_annotations
        .iter()
        .flat_map(|(_, _, set)| annotation_issues(set, AnnotationHolder::Field))
        .collect()
}

fn missing_tag(c: &ControllerView<'_>) -> Vec<Diagnostic> {
    if c.node.annotations.has(&AnnotationKind::Tag) {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::MissingTag,
        format!("controller '{}' has no @Tag", c.node.id.name),
        c.node.span,
    )]
}

fn controller_no_routes(c: &ControllerView<'_>) -> Vec<Diagnostic> {
    if c.route_count > 0 {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::ControllerNoRoutes,
        format!("controller '{}' declares no routes", c.node.id.name),
        c.node.span,
    )]
}

fn missing_method(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let set = &r.node.annotations;
    if set.has(&AnnotationKind::Method) || set.has_malformed(&AnnotationKind::Method) {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::MissingMethod,
        format!("route '{}' has no @Method", r.node.method_name),
        r.node.span,
    )]
}

fn invalid_http_verb(r: &RouteView<'_>) -> Vec<Diagnostic> {
    match r.node.annotations.first(&AnnotationKind::Method) {
        Some(annotation) if r.node.verb.is_none() => vec![Diagnostic::new(
            DiagnosticCode::InvalidHttpVerb,
            format!(
                "'{}' is not an HTTP method",
                annotation.value.as_deref().unwrap_or_default()
            ),
            annotation.value_or_span(),
        )],
        _ => Vec::new(),
    }
}

fn missing_route(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let set = &r.node.annotations;
    if r.node.path.is_some() || set.has_malformed(&AnnotationKind::Route) {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::MissingRoute,
        format!("route '{}' has no @Route", r.node.method_name),
        r.node.span,
    )]
}

fn status_codes(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let set = &r.node.annotations;
    set.annotations
        .iter()
        .filter(|a| matches!(a.kind, AnnotationKind::Response | AnnotationKind::ErrorResponse))
        .filter_map(|a| {
            let raw = a.value.as_deref().unwrap_or_default().trim();
            let span = a.value_or_span();
            match raw.parse::<u16>() {
                Ok(code) if !(100..=599).contains(&code) => Some(Diagnostic::new(
                    DiagnosticCode::InvalidStatusCode,
                    format!("{} is outside the HTTP status code range", code),
                    span,
                )),
                Ok(code) if !REGISTERED_STATUS_CODES.contains(&code) => Some(Diagnostic::new(
                    DiagnosticCode::NonStandardStatusCode,
                    format!("{} is not a registered HTTP status code", code),
                    span,
                )),
                Ok(_) => None,
                Err(_) => Some(Diagnostic::new(
                    DiagnosticCode::InvalidStatusCode,
                    format!("'{}' is not a status code", raw),
                    span,
                )),
            }
        })
        .collect()
}

fn path_linkage(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let linkage = &r.node.linkage;
    let mut out = Vec::new();
    for issue in &linkage.missing_path_refs {
        out.push(Diagnostic::new(
            DiagnosticCode::MissingPathReference,
            format!("path placeholder '{{{}}}' is not bound by any @Path parameter", issue.name),
            issue.span,
        ));
    }
    for issue in &linkage.unknown_refs {
        out.push(Diagnostic::new(
            DiagnosticCode::UnknownParameterReference,
            format!("'{}' does not name a parameter of '{}'", issue.name, r.node.method_name),
            issue.span,
        ));
    }
    for issue in &linkage.duplicate_refs {
        out.push(Diagnostic::new(
            DiagnosticCode::DuplicateParameterReference,
            format!("parameter '{}' is bound by more than one annotation", issue.name),
            issue.span,
        ));
    }
    for issue in &linkage.not_in_route {
        out.push(Diagnostic::new(
            DiagnosticCode::PathParameterNotInRoute,
            format!("path parameter '{}' does not appear in '{}'", issue.name, r.node.full_path),
            issue.span,
        ));
    }
    out
}

fn multiple_body_parameters(r: &RouteView<'_>) -> Vec<Diagnostic> {
    r.params
        .iter()
        .filter(|p| p.location == Some(ParamLocation::Body))
        .skip(1)
        .map(|p| {
            Diagnostic::new(
                DiagnosticCode::MultipleBodyParameters,
                format!("'{}' is a second @Body parameter", p.name),
                p.annotation_span.unwrap_or(p.span),
            )
        })
        .collect()
}

fn body_on_read_verb(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let Some(verb) = r.node.verb.filter(|v| v.is_read_only()) else {
        return Vec::new();
    };
    r.params
        .iter()
        .filter(|p| p.location == Some(ParamLocation::Body))
        .map(|p| {
            Diagnostic::new(
                DiagnosticCode::BodyOnReadVerb,
                format!("{} requests should not carry a body ('{}')", verb, p.name),
                p.annotation_span.unwrap_or(p.span),
            )
        })
        .collect()
}

/// Routes return `error` or `(T, error)`.
fn return_signature(r: &RouteView<'_>) -> Vec<Diagnostic> {
    let ok = match r.returns.as_slice() {
        [only] => only.is_error,
        [value, err] => !value.is_error && err.is_error,
        _ => false,
    };
    if ok {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::InvalidReturnSignature,
        format!(
            "route '{}' must return an error, or a value followed by an error",
            r.node.method_name
        ),
        r.node.span,
    )]
}

fn missing_description(r: &RouteView<'_>) -> Vec<Diagnostic> {
    if !r.node.description.is_empty() {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::MissingDescription,
        format!("route '{}' has no description", r.node.method_name),
        r.node.span,
    )]
}

fn deprecated_route(r: &RouteView<'_>) -> Vec<Diagnostic> {
    match r.node.annotations.first(&AnnotationKind::Deprecated) {
        Some(annotation) => vec![Diagnostic::new(
            DiagnosticCode::DeprecatedRoute,
            format!("route '{}' is deprecated", r.node.method_name),
            annotation.span,
        )],
        None => Vec::new(),
    }
}

fn unreferenced_parameter(p: &ParamNode) -> Vec<Diagnostic> {
    if p.is_context || p.location.is_some() {
        return Vec::new();
    }
    vec![Diagnostic::new(
        DiagnosticCode::UnreferencedParameter,
        format!("parameter '{}' is not bound by any location annotation", p.name),
        p.span,
    )]
}

fn param_type_reference(p: &ParamNode) -> Vec<Diagnostic> {
    type_reference(&p.ty, p.span, &format!("parameter '{}'", p.name))
}

fn return_type_reference(r: &ReturnNode) -> Vec<Diagnostic> {
    type_reference(&r.ty, r.span, &format!("return value #{}", r.ordinal))
}

/// Interfaces and inline types have no schema.
fn type_reference(ty: &TypeMetadata, span: Span, what: &str) -> Vec<Diagnostic> {
    let code = match ty.symbol_kind {
        SymbolKind::Interface => DiagnosticCode::InterfaceTypeReference,
        SymbolKind::Opaque => DiagnosticCode::OpaqueTypeReference,
        _ => return Vec::new(),
    };
    vec![Diagnostic::new(
        code,
        format!("{} has type '{}', which has no schema", what, ty.name),
        span,
    )]
}

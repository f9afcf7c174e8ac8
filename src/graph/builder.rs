//! Walks controller declarations and assembles the symbol graph.
//!
//! For each controller (sorted by identity) the builder parses its
//! annotations, then builds each route: parameter and return types are
//! resolved and interned, referenced models are expanded through the
//! metadata cache, and location annotations are linked to parameters.
//! A failure inside one route is recorded and the walk continues; the
//! build fails at the end if anything was recorded.

use std::sync::Arc;

use lazy_static::lazy_static;
use petgraph::graph::NodeIndex;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    ControllerNode, LinkIssue, Linkage, ModelNode, ModelState, ParamNode, ReturnNode, RouteNode,
    SymbolEdge, SymbolGraph,
};
use crate::analysis::{
    FieldDecl, ImportKind, MethodDecl, PackageProvider, ParamDecl, SourceFile, Span, TypeDecl,
    TypeDeclKind, TypeExpr,
};
use crate::annotations::{parse_annotations, Annotation, AnnotationKind, AnnotationSet};
use crate::cache::MetadataCache;
use crate::config::Config;
use crate::error::{AnalysisError, BuildFailure};
use crate::metadata::{
    AliasInfo, AliasMetadata, DeclId, EnumMetadata, EnumValueMetadata, FieldMetadata, HttpVerb,
    ModelMetadata, ParamLocation, ResponseMetadata, SecurityRequirement, StructMetadata,
    SymbolKind, TypeLayer, TypeMetadata,
};
use crate::resolve::{
    is_primitive, unwrap_containers, ExprLayer, ResolvedDecl, Resolution, SymbolResolver,
};

lazy_static! {
    /// `{name}` placeholders in a route path.
    static ref PLACEHOLDER_PATTERN: Regex = Regex::new(r"\{([^{}/]+)\}").unwrap();
}

/// A struct that embeds the controller marker.
struct ControllerDecl<'f> {
    id: DeclId,
    file: &'f Arc<SourceFile>,
    decl: &'f TypeDecl,
}

/// Builds a [`SymbolGraph`] from extracted source files.
pub struct GraphBuilder<'a> {
    resolver: SymbolResolver<'a>,
    cache: &'a MetadataCache,
    config: &'a Config,
    graph: SymbolGraph,
    errors: Vec<AnalysisError>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        provider: &'a dyn PackageProvider,
        cache: &'a MetadataCache,
        config: &'a Config,
    ) -> Self {
        Self {
            resolver: SymbolResolver::new(provider),
            cache,
            config,
            graph: SymbolGraph::new(),
            errors: Vec::new(),
        }
    }

    /// Build the graph for every controller declared in `files`.
    ///
    /// The order of `files` does not affect the result.
    pub fn build(mut self, files: &[Arc<SourceFile>]) -> Result<SymbolGraph, BuildFailure> {
        let controllers = self.discover_controllers(files);
        info!(controllers = controllers.len(), "building symbol graph");

        for controller in &controllers {
            if let Err(e) = self.build_controller(controller) {
                self.errors
                    .push(e.context(format!("controller {}", controller.id)));
            }
        }

        if !self.errors.is_empty() {
            warn!(errors = self.errors.len(), "graph build failed");
            return Err(BuildFailure::new(self.errors));
        }

        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "symbol graph complete"
        );
        Ok(self.graph)
    }

    fn discover_controllers<'f>(&self, files: &'f [Arc<SourceFile>]) -> Vec<ControllerDecl<'f>> {
        let provider = self.resolver.provider();
        let mut found: Vec<ControllerDecl<'f>> = files
            .iter()
            .flat_map(|file| {
                file.types
                    .iter()
                    .filter(|decl| self.is_controller(decl))
                    .map(move |decl| ControllerDecl {
                        id: DeclId::new(provider.import_path_of(&file.path), decl.name.clone()),
                        file,
                        decl,
                    })
            })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    fn is_controller(&self, decl: &TypeDecl) -> bool {
        let TypeDeclKind::Struct(fields) = &decl.kind else {
            return false;
        };
        fields.iter().filter(|f| f.is_embedded()).any(|f| {
            let (_, base) = unwrap_containers(&f.ty);
            matches!(base, TypeExpr::Named { name, .. } if *name == self.config.controller_marker)
        })
    }

    fn build_controller(&mut self, controller: &ControllerDecl<'_>) -> Result<(), AnalysisError> {
        let annotations = parse_annotations(&controller.decl.doc);
        let node = ControllerNode {
            id: controller.id.clone(),
            file: controller.file.path.clone(),
            version: controller.file.version.clone(),
            span: controller.decl.span,
            tag: annotations.value(&AnnotationKind::Tag).map(str::to_string),
            route_prefix: annotations
                .value(&AnnotationKind::Route)
                .unwrap_or_default()
                .to_string(),
            security: security_requirements(&annotations),
            description: annotations.description(),
            deprecated: annotations.has(&AnnotationKind::Deprecated),
            hidden: annotations.has(&AnnotationKind::Hidden),
            annotations,
        };

        let package = self.resolver.provider().package(&controller.id.package)?;
        let idx = self.graph.add_controller(node.clone());

        let methods: Vec<_> = package
            .methods_of(&controller.decl.name)
            .into_iter()
            .filter(|(_, m)| m.is_exported() && !m.doc.is_empty())
            .map(|(file, m)| (Arc::clone(file), m.clone(), parse_annotations(&m.doc)))
            .filter(|(_, _, annotations)| annotations.is_annotated())
            .collect();

        if methods.is_empty() {
            debug!(controller = %controller.id, "controller has no annotated methods");
        }

        for (ordinal, (file, method, annotations)) in methods.into_iter().enumerate() {
            let route_name = method.qualified_name();
            match self.build_route(&node, &file, &method, annotations) {
                Ok(route) => {
                    let (route, params, returns) = route;
                    let route_idx = self.graph.add_route(idx, ordinal, route);
                    for param in params {
                        let ty = param.ty.clone();
                        let param_idx = self.graph.add_parameter(route_idx, param);
                        self.attach_type(param_idx, SymbolEdge::TypeOf, &ty);
                    }
                    for ret in returns {
                        let ty = ret.ty.clone();
                        let ret_idx = self.graph.add_return(route_idx, ret);
                        self.attach_type(ret_idx, SymbolEdge::TypeOf, &ty);
                    }
                }
                Err(e) => self.errors.push(
                    e.context(format!("route {}", route_name))
                        .context(format!("controller {}", controller.id)),
                ),
            }
        }
        Ok(())
    }

    fn build_route(
        &mut self,
        controller: &ControllerNode,
        file: &SourceFile,
        method: &MethodDecl,
        annotations: AnnotationSet,
    ) -> Result<(RouteNode, Vec<ParamNode>, Vec<ReturnNode>), AnalysisError> {
        let package_path = controller.id.package.as_str();
        debug!(route = %method.qualified_name(), "building route");

        let mut params = Vec::with_capacity(method.params.len());
        for (ordinal, param) in method.params.iter().enumerate() {
            let name = param_name(param, ordinal);
            let ty = self
                .type_metadata(file, package_path, &param.ty)
                .map_err(|e| e.context(format!("parameter '{}'", name)))?;
            let is_context = ty.symbol_kind == SymbolKind::Special
                && ty.package_path == "context"
                && ty.base_name == "Context"
                && ty.layers.is_empty();
            params.push(ParamNode {
                ordinal,
                wire_name: name.clone(),
                name,
                span: param.span,
                ty,
                location: None,
                validator: None,
                description: String::new(),
                annotation_span: None,
                is_context,
            });
        }

        let mut returns = Vec::with_capacity(method.results.len());
        for (ordinal, result) in method.results.iter().enumerate() {
            let ty = self
                .type_metadata(file, package_path, &result.ty)
                .map_err(|e| e.context(format!("return value #{}", ordinal)))?;
            let is_structured_error = ty.symbol_kind == SymbolKind::Struct
                && ty.layers.iter().all(|l| *l == TypeLayer::Pointer)
                && self.config.is_structured_error(&ty.base_name);
            let is_error = is_structured_error
                || (ty.symbol_kind == SymbolKind::Builtin
                    && ty.base_name == "error"
                    && ty.layers.is_empty());
            returns.push(ReturnNode {
                ordinal,
                span: result.span,
                ty,
                is_error,
                is_structured_error,
            });
        }

        let verb = annotations
            .value(&AnnotationKind::Method)
            .and_then(|v| v.parse::<HttpVerb>().ok());
        let path = annotations.value(&AnnotationKind::Route).map(str::to_string);
        let full_path = join_paths(&controller.route_prefix, path.as_deref().unwrap_or(""));
        let path_span = annotations
            .first(&AnnotationKind::Route)
            .map(Annotation::value_or_span)
            .unwrap_or(method.span);
        let linkage = link_parameters(&full_path, path_span, &annotations, &mut params);

        let content_types = match annotations.value(&AnnotationKind::ContentType) {
            Some(value) => value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![self.config.default_content_type.clone()],
        };

        let route = RouteNode {
            id: DeclId::new(package_path, method.qualified_name()),
            controller: controller.id.clone(),
            method_name: method.name.clone(),
            file: file.path.clone(),
            version: file.version.clone(),
            span: method.span,
            verb,
            path,
            full_path,
            content_types,
            security: security_requirements(&annotations),
            responses: responses(&annotations),
            description: annotations.description(),
            deprecated: annotations.has(&AnnotationKind::Deprecated),
            hidden: annotations.has(&AnnotationKind::Hidden),
            linkage,
            annotations,
        };
        Ok((route, params, returns))
    }

    /// Intern `ty`, link `from` to it, and link it to the models it names.
    fn attach_type(&mut self, from: NodeIndex, edge: SymbolEdge, ty: &TypeMetadata) {
        let type_idx = self.graph.intern_type(ty);
        self.graph.add_edge(from, type_idx, edge);
        for id in ty.referenced_models() {
            if let Some((model_idx, state)) = self.graph.model_entry(&id) {
                if state != ModelState::Failed {
                    self.graph.link(type_idx, model_idx, SymbolEdge::References);
                }
            }
        }
    }

    /// Resolve a type expression to its structural metadata, expanding any
    /// model it refers to.
    fn type_metadata(
        &mut self,
        file: &SourceFile,
        package_path: &str,
        expr: &TypeExpr,
    ) -> Result<TypeMetadata, AnalysisError> {
        let (expr_layers, base) = unwrap_containers(expr);
        let resolution = self.resolver.resolve_base(file, package_path, base)?;
        let mut meta = self.base_metadata(resolution, base)?;

        let mut layers = Vec::with_capacity(expr_layers.len());
        for layer in expr_layers {
            layers.push(match layer {
                ExprLayer::Pointer => TypeLayer::Pointer,
                ExprLayer::Slice => TypeLayer::Slice,
                ExprLayer::Array(len) => TypeLayer::Array {
                    len: len.to_string(),
                },
                ExprLayer::Map(key) => TypeLayer::Map {
                    key: Box::new(self.type_metadata(file, package_path, key)?),
                },
                ExprLayer::Chan => TypeLayer::Chan,
            });
        }

        meta.is_by_reference = layers.first() == Some(&TypeLayer::Pointer);
        meta.name = TypeMetadata::format_name(&layers, &meta.base_name);
        meta.layers = layers;
        Ok(meta)
    }

    fn base_metadata(
        &mut self,
        resolution: Resolution,
        base: &TypeExpr,
    ) -> Result<TypeMetadata, AnalysisError> {
        let blank = |name: &str, kind: SymbolKind, is_builtin: bool| TypeMetadata {
            name: name.to_string(),
            base_name: name.to_string(),
            package_path: String::new(),
            default_alias: String::new(),
            description: String::new(),
            import_kind: ImportKind::Universe,
            is_builtin,
            is_by_reference: false,
            symbol_kind: kind,
            alias: None,
            layers: Vec::new(),
        };

        match resolution {
            Resolution::Universe(name) => Ok(blank(name, SymbolKind::Builtin, true)),
            Resolution::Special {
                package_path,
                package_name,
                name,
                import_kind,
            } => Ok(TypeMetadata {
                package_path,
                default_alias: package_name,
                import_kind,
                ..blank(&name, SymbolKind::Special, true)
            }),
            Resolution::Opaque(text) => Ok(blank(&text, SymbolKind::Opaque, false)),
            Resolution::Unresolved { reason } => Err(AnalysisError::Unresolved {
                name: base.to_string(),
                reason,
            }),
            Resolution::Declared(decl) => {
                let kind = classify(&decl);
                if kind.is_model() {
                    self.expand_model(&decl, kind)?;
                }
                let annotations = parse_annotations(&decl.decl.doc);
                Ok(TypeMetadata {
                    package_path: decl.id.package.clone(),
                    default_alias: decl.package.name.clone(),
                    description: annotations.description(),
                    import_kind: decl.import_kind,
                    alias: alias_info(&decl, kind),
                    ..blank(&decl.id.name, kind, false)
                })
            }
        }
    }

    /// Expand a model declaration into the graph, or return its existing
    /// node. A declaration already in progress is returned as-is, which
    /// terminates self-referential types.
    fn expand_model(
        &mut self,
        decl: &ResolvedDecl,
        kind: SymbolKind,
    ) -> Result<NodeIndex, AnalysisError> {
        match self.graph.model_entry(&decl.id) {
            Some((_, ModelState::Failed)) => {
                return Err(AnalysisError::Unresolved {
                    name: decl.id.to_string(),
                    reason: "an earlier expansion of this type failed".to_string(),
                })
            }
            Some((idx, _)) => return Ok(idx),
            None => {}
        }

        let annotations = parse_annotations(&decl.decl.doc);
        let field_annotations = match &decl.decl.kind {
            TypeDeclKind::Struct(fields) => fields
                .iter()
                .map(|f| (field_name(f), f.span, parse_annotations(&f.doc)))
                .collect(),
            _ => Vec::new(),
        };
        let version = decl.file.version.clone();
        let idx = self.graph.begin_model(ModelNode {
            id: decl.id.clone(),
            kind,
            file: decl.file.path.clone(),
            version: version.clone(),
            span: decl.decl.span,
            annotations: annotations.clone(),
            field_annotations,
            metadata: None,
        });

        let result = match self.cache.get_fresh(&decl.id, version.as_ref()) {
            Some(cached) => self
                .refresh_cached(decl, kind, &annotations, cached.clone())
                .map(|metadata| {
                    if metadata != cached {
                        if let Some(version) = version {
                            self.cache.put(decl.id.clone(), metadata.clone(), version);
                        }
                    }
                    metadata
                }),
            None => self.compute_model(decl, kind, &annotations).map(|metadata| {
                if let Some(version) = version {
                    self.cache.put(decl.id.clone(), metadata.clone(), version);
                }
                metadata
            }),
        };

        match result {
            Ok(metadata) => {
                match &metadata {
                    ModelMetadata::Struct(s) => {
                        for (ordinal, field) in s.fields.iter().enumerate() {
                            let edge = SymbolEdge::Field {
                                ordinal,
                                name: field.name.clone(),
                            };
                            self.attach_type(idx, edge, &field.ty);
                        }
                    }
                    ModelMetadata::Alias(a) => {
                        self.attach_type(idx, SymbolEdge::Underlying, &a.underlying)
                    }
                    ModelMetadata::Enum(_) => {}
                }
                self.graph.complete_model(idx, metadata);
                Ok(idx)
            }
            Err(e) => {
                self.graph.fail_model(&decl.id);
                Err(e.context(format!("type {}", decl.id)))
            }
        }
    }

    /// Re-derive the parts of cached metadata that come from other files.
    /// The declaring file is unchanged, so names, tags and docs are kept,
    /// but field and underlying types are resolved again (expanding the
    /// models they name) and enum values are recollected from the package.
    fn refresh_cached(
        &mut self,
        decl: &ResolvedDecl,
        kind: SymbolKind,
        annotations: &AnnotationSet,
        cached: ModelMetadata,
    ) -> Result<ModelMetadata, AnalysisError> {
        let package_path = decl.package.import_path.as_str();
        match (cached, &decl.decl.kind) {
            (ModelMetadata::Struct(mut s), TypeDeclKind::Struct(fields)) => {
                for field in &mut s.fields {
                    let Some(source) = fields.iter().find(|f| field_name(f) == field.name) else {
                        return self.compute_model(decl, kind, annotations);
                    };
                    field.ty = self
                        .type_metadata(&decl.file, package_path, &source.ty)
                        .map_err(|e| e.context(format!("field '{}'", field.name)))?;
                }
                Ok(ModelMetadata::Struct(s))
            }
            (
                ModelMetadata::Alias(mut a),
                TypeDeclKind::Named(underlying) | TypeDeclKind::Alias(underlying),
            ) if kind == SymbolKind::Alias => {
                a.underlying = self
                    .type_metadata(&decl.file, package_path, underlying)
                    .map_err(|e| e.context("underlying type"))?;
                Ok(ModelMetadata::Alias(a))
            }
            _ => self.compute_model(decl, kind, annotations),
        }
    }

    fn compute_model(
        &mut self,
        decl: &ResolvedDecl,
        kind: SymbolKind,
        annotations: &AnnotationSet,
    ) -> Result<ModelMetadata, AnalysisError> {
        let package_path = decl.package.import_path.as_str();
        let description = annotations.description();
        let deprecated = annotations.has(&AnnotationKind::Deprecated);

        match (&decl.decl.kind, kind) {
            (TypeDeclKind::Struct(fields), _) => {
                let mut out = Vec::new();
                for field in fields {
                    let Some(json_name) = json_name(field) else {
                        continue;
                    };
                    let name = field_name(field);
                    let ty = self
                        .type_metadata(&decl.file, package_path, &field.ty)
                        .map_err(|e| e.context(format!("field '{}'", name)))?;
                    let field_annotations = parse_annotations(&field.doc);
                    out.push(FieldMetadata {
                        json_name,
                        ty,
                        description: field_annotations.description(),
                        validator: field.tag_value("validate").filter(|v| !v.is_empty()),
                        deprecated: field_annotations.has(&AnnotationKind::Deprecated),
                        embedded: field.is_embedded(),
                        name,
                    });
                }
                Ok(ModelMetadata::Struct(StructMetadata {
                    id: decl.id.clone(),
                    description,
                    deprecated,
                    fields: out,
                }))
            }
            (TypeDeclKind::Named(underlying), SymbolKind::Enum) => {
                let values = decl
                    .package
                    .consts_of_type(&decl.decl.name)
                    .into_iter()
                    .map(|c| {
                        let annotations = parse_annotations(&c.doc);
                        EnumValueMetadata {
                            name: c.name.clone(),
                            value: c.value.clone().unwrap_or_default(),
                            description: annotations.description(),
                            deprecated: annotations.has(&AnnotationKind::Deprecated),
                        }
                    })
                    .collect();
                Ok(ModelMetadata::Enum(EnumMetadata {
                    id: decl.id.clone(),
                    description,
                    deprecated,
                    underlying: underlying.to_string(),
                    values,
                }))
            }
            (TypeDeclKind::Named(underlying), _) | (TypeDeclKind::Alias(underlying), _) => {
                let underlying_meta = self
                    .type_metadata(&decl.file, package_path, underlying)
                    .map_err(|e| e.context("underlying type"))?;
                Ok(ModelMetadata::Alias(AliasMetadata {
                    id: decl.id.clone(),
                    description,
                    deprecated,
                    is_type_alias: matches!(decl.decl.kind, TypeDeclKind::Alias(_)),
                    underlying: underlying_meta,
                }))
            }
            (TypeDeclKind::Interface, _) => Err(AnalysisError::MalformedDeclaration {
                name: decl.id.to_string(),
                reason: "interfaces are not expanded".to_string(),
            }),
        }
    }
}

/// Symbol kind of a declared type. A named primitive with constants of
/// its type is an enum; other named types are aliases.
fn classify(decl: &ResolvedDecl) -> SymbolKind {
    match &decl.decl.kind {
        TypeDeclKind::Struct(_) => SymbolKind::Struct,
        TypeDeclKind::Interface => SymbolKind::Interface,
        TypeDeclKind::Alias(_) => SymbolKind::Alias,
        TypeDeclKind::Named(TypeExpr::Named {
            qualifier: None,
            name,
        }) if is_primitive(name) && !decl.package.consts_of_type(&decl.decl.name).is_empty() => {
            SymbolKind::Enum
        }
        TypeDeclKind::Named(_) => SymbolKind::Alias,
    }
}

fn alias_info(decl: &ResolvedDecl, kind: SymbolKind) -> Option<AliasInfo> {
    let underlying = match &decl.decl.kind {
        TypeDeclKind::Named(expr) | TypeDeclKind::Alias(expr) => expr.to_string(),
        _ => return None,
    };
    let values = if kind == SymbolKind::Enum {
        decl.package
            .consts_of_type(&decl.decl.name)
            .into_iter()
            .map(|c| c.value.clone().unwrap_or_else(|| c.name.clone()))
            .collect()
    } else {
        Vec::new()
    };
    Some(AliasInfo {
        name: decl.decl.name.clone(),
        underlying,
        values,
    })
}

fn param_name(param: &ParamDecl, ordinal: usize) -> String {
    match param.name.as_deref() {
        Some(name) if name != "_" => name.to_string(),
        _ => format!("#{}", ordinal),
    }
}

fn field_name(field: &FieldDecl) -> String {
    match &field.name {
        Some(name) => name.clone(),
        None => {
            let (_, base) = unwrap_containers(&field.ty);
            match base {
                TypeExpr::Named { name, .. } => name.clone(),
                other => other.to_string(),
            }
        }
    }
}

/// Wire name of a struct field, or `None` when it is not serialized
/// (unexported, or tagged `json:"-"`).
fn json_name(field: &FieldDecl) -> Option<String> {
    let name = field_name(field);
    if !name.chars().next().is_some_and(|c| c.is_uppercase()) {
        return None;
    }
    match field.tag_value("json") {
        Some(tag) => {
            let tag_name = tag.split(',').next().unwrap_or("");
            match tag_name {
                "-" => None,
                "" => Some(name),
                other => Some(other.to_string()),
            }
        }
        None => Some(name),
    }
}

fn security_requirements(annotations: &AnnotationSet) -> Vec<SecurityRequirement> {
    annotations
        .all(&AnnotationKind::Security)
        .filter_map(|a| {
            a.value.as_ref().map(|scheme| SecurityRequirement {
                scheme: scheme.clone(),
                scopes: a.option_strings("scopes"),
            })
        })
        .collect()
}

fn responses(annotations: &AnnotationSet) -> Vec<ResponseMetadata> {
    annotations
        .annotations
        .iter()
        .filter(|a| matches!(a.kind, AnnotationKind::Response | AnnotationKind::ErrorResponse))
        .map(|a| {
            let raw = a.value.clone().unwrap_or_default();
            ResponseMetadata {
                code: raw.trim().parse::<u16>().ok(),
                raw_code: raw,
                description: a.description.clone(),
                is_error: a.kind == AnnotationKind::ErrorResponse,
            }
        })
        .collect()
}

/// Join a controller prefix and a route path into one normalized path.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Placeholder names in a route path, in order of appearance.
pub(crate) fn path_placeholders(path: &str) -> Vec<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(path)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Bind location annotations to parameters by Go name and check path
/// placeholders against `@Path` parameters.
fn link_parameters(
    full_path: &str,
    path_span: Span,
    annotations: &AnnotationSet,
    params: &mut [ParamNode],
) -> Linkage {
    let mut linkage = Linkage::default();
    let locations: Vec<(ParamLocation, &Annotation)> = annotations.locations().collect();

    for (location, annotation) in &locations {
        let Some(target) = annotation.value.as_deref() else {
            continue;
        };
        if !params.iter().any(|p| !p.is_context && p.name == target) {
            linkage.unknown_refs.push(LinkIssue {
                name: target.to_string(),
                span: annotation.value_or_span(),
            });
            continue;
        }
        for param in params.iter_mut().filter(|p| !p.is_context && p.name == target) {
            if param.location.is_some() {
                linkage.duplicate_refs.push(LinkIssue {
                    name: target.to_string(),
                    span: annotation.value_or_span(),
                });
                continue;
            }
            param.location = Some(*location);
            param.wire_name = annotation
                .option_str("name")
                .map(str::to_string)
                .unwrap_or_else(|| param.name.clone());
            param.validator = annotation.option_str("validate").map(str::to_string);
            param.description = annotation.description.clone();
            param.annotation_span = Some(annotation.span);
        }
    }

    for param in params.iter().filter(|p| !p.is_context && p.location.is_none()) {
        linkage.unreferenced.push(LinkIssue {
            name: param.name.clone(),
            span: param.span,
        });
    }

    let placeholders = path_placeholders(full_path);
    for placeholder in &placeholders {
        let bound = params
            .iter()
            .any(|p| p.location == Some(ParamLocation::Path) && p.wire_name == *placeholder);
        if !bound {
            linkage.missing_path_refs.push(LinkIssue {
                name: placeholder.clone(),
                span: path_span,
            });
        }
    }
    for param in params
        .iter()
        .filter(|p| p.location == Some(ParamLocation::Path))
    {
        if !placeholders.contains(&param.wire_name) {
            linkage.not_in_route.push(LinkIssue {
                name: param.wire_name.clone(),
                span: param.annotation_span.unwrap_or(param.span),
            });
        }
    }

    linkage
}

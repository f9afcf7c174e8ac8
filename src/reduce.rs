//! Flattening of the symbol graph into the metadata contract consumed by
//! spec and code generators.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::graph::{ParamNode, ReturnNode, RouteNode, SymbolGraph};
use crate::metadata::{
    AliasMetadata, DeclId, EnumMetadata, HttpVerb, ModelMetadata, ParamLocation,
    ResponseMetadata, SecurityRequirement, StructMetadata, TypeMetadata,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatParam {
    pub ordinal: usize,
    pub name: String,
    pub wire_name: String,
    /// `None` only for context parameters.
    pub location: Option<ParamLocation>,
    #[serde(rename = "type")]
    pub ty: TypeMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    pub description: String,
    pub is_context: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatReturn {
    pub ordinal: usize,
    #[serde(rename = "type")]
    pub ty: TypeMetadata,
    pub is_error: bool,
    pub is_structured_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRoute {
    pub operation_id: String,
    pub verb: Option<HttpVerb>,
    pub path: String,
    pub description: String,
    pub deprecated: bool,
    pub hidden: bool,
    pub content_types: Vec<String>,
    /// Route override, or the controller default when the route has none.
    pub security: Vec<SecurityRequirement>,
    pub responses: Vec<ResponseMetadata>,
    pub params: Vec<FlatParam>,
    pub returns: Vec<FlatReturn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatController {
    pub name: String,
    pub package: String,
    pub tag: Option<String>,
    pub description: String,
    pub deprecated: bool,
    pub routes: Vec<FlatRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatModels {
    pub structs: Vec<StructMetadata>,
    pub enums: Vec<EnumMetadata>,
    pub aliases: Vec<AliasMetadata>,
}

impl FlatModels {
    pub fn len(&self) -> usize {
        self.structs.len() + self.enums.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a generator needs, in a stable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedMetadata {
    pub controllers: Vec<FlatController>,
    pub models: FlatModels,
    /// Whether any included route returns a configured structured error
    /// type rather than plain `error`.
    pub has_error_type_references: bool,
}

/// Flatten `graph`.
///
/// Models are the closure of everything reachable from the included
/// routes, each listed once and sorted by identity. Cache entries still
/// matching the declaring file are preferred over the metadata stored on
/// the graph node.
pub fn reduce(graph: &SymbolGraph, config: &Config, cache: &MetadataCache) -> ReducedMetadata {
    let mut controllers = Vec::new();
    let mut roots = Vec::new();
    let mut has_error_type_references = false;

    for (ctrl_idx, controller) in graph.controllers() {
        let mut routes = Vec::new();
        for (route_idx, route) in graph.routes(ctrl_idx) {
            if config.exclude_hidden_routes && (route.hidden || controller.hidden) {
                debug!(route = %route.id, "skipping hidden route");
                continue;
            }

            let params = graph.parameters(route_idx);
            let returns = graph.returns(route_idx);
            roots.extend(params.iter().map(|(idx, _)| *idx));
            roots.extend(returns.iter().map(|(idx, _)| *idx));
            has_error_type_references |= returns.iter().any(|(_, r)| r.is_structured_error);

            let security = if route.security.is_empty() {
                controller.security.clone()
            } else {
                route.security.clone()
            };
            routes.push(flat_route(
                route,
                security,
                params.into_iter().map(|(_, p)| p),
                returns.into_iter().map(|(_, r)| r),
            ));
        }

        controllers.push(FlatController {
            name: controller.id.name.clone(),
            package: controller.id.package.clone(),
            tag: controller.tag.clone(),
            description: controller.description.clone(),
            deprecated: controller.deprecated,
            routes,
        });
    }

    let mut collected: BTreeMap<DeclId, ModelMetadata> = BTreeMap::new();
    for (_, model) in graph.reachable_models(&roots) {
        // Plain lookup: reduction must not move the hit/miss counters or
        // evict entries.
        let cached = cache.get(&model.id).and_then(|(metadata, version)| {
            let current = model.version.as_ref()?;
            (!version.has_changed(current)).then_some(metadata)
        });
        let metadata = cached.or_else(|| model.metadata.clone());
        if let Some(metadata) = metadata {
            collected.insert(model.id.clone(), metadata);
        }
    }

    let mut models = FlatModels::default();
    for metadata in collected.into_values() {
        match metadata {
            ModelMetadata::Struct(s) => models.structs.push(s),
            ModelMetadata::Enum(e) => models.enums.push(e),
            ModelMetadata::Alias(a) => models.aliases.push(a),
        }
    }

    debug!(
        controllers = controllers.len(),
        models = models.len(),
        "reduced graph"
    );
    ReducedMetadata {
        controllers,
        models,
        has_error_type_references,
    }
}

fn flat_route<'g>(
    route: &RouteNode,
    security: Vec<SecurityRequirement>,
    params: impl Iterator<Item = &'g ParamNode>,
    returns: impl Iterator<Item = &'g ReturnNode>,
) -> FlatRoute {
    FlatRoute {
        operation_id: route.method_name.clone(),
        verb: route.verb,
        path: route.full_path.clone(),
        description: route.description.clone(),
        deprecated: route.deprecated,
        hidden: route.hidden,
        content_types: route.content_types.clone(),
        security,
        responses: route.responses.clone(),
        params: params
            .map(|p| FlatParam {
                ordinal: p.ordinal,
                name: p.name.clone(),
                wire_name: p.wire_name.clone(),
                location: p.location,
                ty: p.ty.clone(),
                validator: p.validator.clone(),
                description: p.description.clone(),
                is_context: p.is_context,
            })
            .collect(),
        returns: returns
            .map(|r| FlatReturn {
                ordinal: r.ordinal,
                ty: r.ty.clone(),
                is_error: r.is_error,
                is_structured_error: r.is_structured_error,
            })
            .collect(),
    }
}

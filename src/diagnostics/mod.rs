//! Validation of a finished symbol graph.
//!
//! `validate` runs the rule tables in [`rules`] over every controller,
//! route, parameter, return value and model, and returns one
//! [`DiagnosticEntity`] tree per controller followed by one entity per model
//! that has findings.

mod rules;
mod types;

pub use types::{
    ClassifiedDiagnostics, Diagnostic, DiagnosticCode, DiagnosticEntity, EntityKind, Severity,
};

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use tracing::debug;

use crate::graph::{ControllerNode, ModelNode, SymbolGraph};
use crate::metadata::SymbolKind;
use rules::{
    ControllerView, RouteView, CONTROLLER_RULES, MODEL_RULES, PARAM_RULES, RETURN_RULES,
    ROUTE_RULES,
};

/// Run every rule over `graph`.
///
/// Controllers are validated in parallel; the result is ordered by
/// controller identity, then model identity, regardless of scheduling.
pub fn validate(graph: &SymbolGraph) -> Vec<DiagnosticEntity> {
    let controllers = graph.controllers();
    let mut entities: Vec<DiagnosticEntity> = controllers
        .par_iter()
        .map(|&(idx, controller)| validate_controller(graph, idx, controller))
        .collect();

    entities.extend(
        graph
            .models()
            .into_iter()
            .map(|(_, model)| validate_model(model))
            .filter(|entity| !entity.diagnostics.is_empty()),
    );

    debug!(entities = entities.len(), "validation complete");
    entities
}

fn validate_controller(
    graph: &SymbolGraph,
    idx: NodeIndex,
    controller: &ControllerNode,
) -> DiagnosticEntity {
    let routes = graph.routes(idx);
    let mut entity = DiagnosticEntity::new(
        EntityKind::Controller,
        controller.id.name.clone(),
        Some(controller.file.clone()),
    );

    let view = ControllerView {
        node: controller,
        route_count: routes.len(),
    };
    entity.diagnostics = CONTROLLER_RULES.iter().flat_map(|rule| rule(&view)).collect();

    for (route_idx, route) in routes {
        let params = graph.parameters(route_idx);
        let returns = graph.returns(route_idx);

        let mut route_entity = DiagnosticEntity::new(
            EntityKind::Route,
            route.method_name.clone(),
            Some(route.file.clone()),
        );

        for (_, param) in &params {
            let diagnostics: Vec<_> = PARAM_RULES.iter().flat_map(|rule| rule(*param)).collect();
            if !diagnostics.is_empty() {
                let mut child = DiagnosticEntity::new(
                    EntityKind::Parameter,
                    param.name.clone(),
                    Some(route.file.clone()),
                );
                child.diagnostics = diagnostics;
                route_entity.children.push(child);
            }
        }
        for (_, ret) in &returns {
            let diagnostics: Vec<_> = RETURN_RULES.iter().flat_map(|rule| rule(*ret)).collect();
            if !diagnostics.is_empty() {
                let mut child = DiagnosticEntity::new(
                    EntityKind::ReturnValue,
                    format!("#{}", ret.ordinal),
                    Some(route.file.clone()),
                );
                child.diagnostics = diagnostics;
                route_entity.children.push(child);
            }
        }

        let view = RouteView {
            node: route,
            params: params.iter().map(|(_, p)| *p).collect(),
            returns: returns.iter().map(|(_, r)| *r).collect(),
        };
        route_entity.diagnostics = ROUTE_RULES.iter().flat_map(|rule| rule(&view)).collect();
        entity.children.push(route_entity);
    }

    entity
}

fn validate_model(model: &ModelNode) -> DiagnosticEntity {
    let kind = match model.kind {
        SymbolKind::Enum => EntityKind::Enum,
        SymbolKind::Alias => EntityKind::Alias,
        _ => EntityKind::Struct,
    };
    let mut entity = DiagnosticEntity::new(kind, model.id.to_string(), Some(model.file.clone()));
    entity.diagnostics = MODEL_RULES.iter().flat_map(|rule| rule(model)).collect();
    entity
}


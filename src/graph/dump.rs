//! Human-readable renderings of the symbol graph.

use std::fmt::Write;

use petgraph::dot::Dot;

use super::{SymbolGraph, SymbolNode};
use crate::metadata::ModelMetadata;

impl SymbolGraph {
    /// Graphviz rendering of every node and edge.
    pub fn dump_dot(&self) -> String {
        format!("{}", Dot::with_config(self.inner(), &[]))
    }

    /// Indented outline of controllers, routes, canonical types and models.
    ///
    /// Everything is ordered by content, so two builds of the same sources
    /// dump identically whatever order files were read in.
    pub fn dump_text(&self) -> String {
        let mut out = String::new();

        for (ctrl_idx, controller) in self.controllers() {
            let _ = writeln!(out, "controller {}", controller.id);
            if let Some(tag) = &controller.tag {
                let _ = writeln!(out, "  tag: {}", tag);
            }
            for (route_idx, route) in self.routes(ctrl_idx) {
                let verb = route.verb.map(|v| v.as_str()).unwrap_or("?");
                let _ = writeln!(out, "  route {} {} {}", route.method_name, verb, route.full_path);
                for (_, param) in self.parameters(route_idx) {
                    let location = param
                        .location
                        .map(|l| l.as_str().to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let _ = writeln!(
                        out,
                        "    param {} {} {}: {}",
                        param.ordinal, location, param.wire_name, param.ty.name
                    );
                }
                for (_, ret) in self.returns(route_idx) {
                    let marker = if ret.is_error { " (error)" } else { "" };
                    let _ = writeln!(out, "    return {}: {}{}", ret.ordinal, ret.ty.name, marker);
                }
            }
        }

        let types = self.type_nodes();
        let _ = writeln!(out, "types ({})", types.len());
        for (_, ty) in types {
            let package = if ty.package_path.is_empty() {
                String::new()
            } else {
                format!(" @ {}", ty.package_path)
            };
            let _ = writeln!(out, "  {} [{}]{}", ty.name, ty.symbol_kind.as_str(), package);
        }

        let models = self.models();
        let _ = writeln!(out, "models ({})", models.len());
        for (_, model) in models {
            let _ = writeln!(out, "  {} {}", model.kind.as_str(), model.id);
            match &model.metadata {
                Some(ModelMetadata::Struct(s)) => {
                    for field in &s.fields {
                        let _ = writeln!(out, "    {} {}", field.json_name, field.ty.name);
                    }
                }
                Some(ModelMetadata::Enum(e)) => {
                    for value in &e.values {
                        let _ = writeln!(out, "    {} = {}", value.name, value.value);
                    }
                }
                Some(ModelMetadata::Alias(a)) => {
                    let _ = writeln!(out, "    = {}", a.underlying.name);
                }
                None => {
                    let _ = writeln!(out, "    (incomplete)");
                }
            }
        }

        out
    }

    /// Number of nodes of each kind: controllers, routes, parameters,
    /// returns, types, models.
    pub fn node_counts(&self) -> [usize; 6] {
        let mut counts = [0; 6];
        for node in self.inner().node_weights() {
            let slot = match node {
                SymbolNode::Controller(_) => 0,
                SymbolNode::Route(_) => 1,
                SymbolNode::Parameter(_) => 2,
                SymbolNode::ReturnValue(_) => 3,
                SymbolNode::Type(_) => 4,
                SymbolNode::Model(_) => 5,
            };
            counts[slot] += 1;
        }
        counts
    }
}

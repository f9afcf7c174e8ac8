//! Symbol graph of controllers, routes and the types they reference.
//!
//! Structure:
//!
//! ```text
//! Controller ──Route(n)──▶ Route ──Parameter(n)──▶ Parameter ──TypeOf──▶ Type
//!                            └────Return(n)─────▶ ReturnValue ──TypeOf──▶ Type
//! Type ──References──▶ Model ──Field(n)/Underlying──▶ Type
//! ```
//!
//! Type nodes are canonical: one node per distinct `TypeMetadata`. Model
//! nodes are unique per declaration identity and carry an expansion state
//! so that self-referential types terminate.

mod builder;
mod dump;

pub use builder::GraphBuilder;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::analysis::Span;
use crate::annotations::AnnotationSet;
use crate::cache::FileVersion;
use crate::metadata::{
    DeclId, HttpVerb, ModelMetadata, ParamLocation, ResponseMetadata, SecurityRequirement,
    SymbolKind, TypeMetadata,
};

#[derive(Debug, Clone)]
pub struct ControllerNode {
    pub id: DeclId,
    pub file: PathBuf,
    pub version: Option<FileVersion>,
    pub span: Span,
    pub annotations: AnnotationSet,
    pub tag: Option<String>,
    /// Prefix from the controller's `@Route`, possibly empty.
    pub route_prefix: String,
    /// Default security for every route.
    pub security: Vec<SecurityRequirement>,
    pub description: String,
    pub deprecated: bool,
    pub hidden: bool,
}

/// A parameter or path placeholder that failed to link, with the span to
/// report it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkIssue {
    pub name: String,
    pub span: Span,
}

/// Unmatched names found while linking annotations to parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linkage {
    /// Route placeholders bound by no `@Path` parameter.
    pub missing_path_refs: Vec<LinkIssue>,
    /// Parameters with no location annotation.
    pub unreferenced: Vec<LinkIssue>,
    /// Location annotations naming no parameter.
    pub unknown_refs: Vec<LinkIssue>,
    /// Parameters named by more than one location annotation.
    pub duplicate_refs: Vec<LinkIssue>,
    /// `@Path` parameters whose wire name is not a placeholder.
    pub not_in_route: Vec<LinkIssue>,
}

impl Linkage {
    pub fn is_clean(&self) -> bool {
        self.missing_path_refs.is_empty()
            && self.unreferenced.is_empty()
            && self.unknown_refs.is_empty()
            && self.duplicate_refs.is_empty()
            && self.not_in_route.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RouteNode {
    /// Package path plus `Controller.Method`.
    pub id: DeclId,
    pub controller: DeclId,
    pub method_name: String,
    pub file: PathBuf,
    pub version: Option<FileVersion>,
    pub span: Span,
    pub annotations: AnnotationSet,
    /// `None` when `@Method` is missing or not a known verb.
    pub verb: Option<HttpVerb>,
    /// Path from `@Route`, relative to the controller prefix.
    pub path: Option<String>,
    pub full_path: String,
    pub content_types: Vec<String>,
    /// Per-route override; empty means the controller default applies.
    pub security: Vec<SecurityRequirement>,
    pub responses: Vec<ResponseMetadata>,
    pub description: String,
    pub deprecated: bool,
    pub hidden: bool,
    pub linkage: Linkage,
}

#[derive(Debug, Clone)]
pub struct ParamNode {
    pub ordinal: usize,
    pub name: String,
    pub span: Span,
    pub ty: TypeMetadata,
    pub location: Option<ParamLocation>,
    /// Name on the wire; the `name` option or the Go name.
    pub wire_name: String,
    pub validator: Option<String>,
    pub description: String,
    /// Span of the location annotation that bound this parameter.
    pub annotation_span: Option<Span>,
    /// `context.Context` parameters are injected, never bound.
    pub is_context: bool,
}

#[derive(Debug, Clone)]
pub struct ReturnNode {
    pub ordinal: usize,
    pub span: Span,
    pub ty: TypeMetadata,
    pub is_error: bool,
    /// Error return whose type is a configured structured error struct.
    pub is_structured_error: bool,
}

/// A struct, enum or alias declaration.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub id: DeclId,
    pub kind: SymbolKind,
    pub file: PathBuf,
    pub version: Option<FileVersion>,
    pub span: Span,
    pub annotations: AnnotationSet,
    /// Annotation blocks of struct fields, by field name.
    pub field_annotations: Vec<(String, Span, AnnotationSet)>,
    /// `None` while the declaration is being expanded.
    pub metadata: Option<ModelMetadata>,
}

#[derive(Debug, Clone)]
pub enum SymbolNode {
    Controller(ControllerNode),
    Route(RouteNode),
    Parameter(ParamNode),
    ReturnValue(ReturnNode),
    Type(TypeMetadata),
    Model(ModelNode),
}

impl fmt::Display for SymbolNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolNode::Controller(c) => write!(f, "controller {}", c.id.name),
            SymbolNode::Route(r) => match (&r.verb, r.path.as_ref()) {
                (Some(verb), Some(_)) => write!(f, "route {} {} {}", r.method_name, verb, r.full_path),
                _ => write!(f, "route {}", r.method_name),
            },
            SymbolNode::Parameter(p) => match p.location {
                Some(loc) => write!(f, "param {} ({}): {}", p.name, loc, p.ty.name),
                None => write!(f, "param {}: {}", p.name, p.ty.name),
            },
            SymbolNode::ReturnValue(r) => write!(f, "return #{}: {}", r.ordinal, r.ty.name),
            SymbolNode::Type(t) => write!(f, "type {} [{}]", t.name, t.symbol_kind.as_str()),
            SymbolNode::Model(m) => write!(f, "{} {}", m.kind.as_str(), m.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolEdge {
    Route { ordinal: usize },
    Parameter { ordinal: usize },
    Return { ordinal: usize },
    TypeOf,
    Field { ordinal: usize, name: String },
    Underlying,
    References,
}

impl SymbolEdge {
    fn ordinal(&self) -> usize {
        match self {
            SymbolEdge::Route { ordinal }
            | SymbolEdge::Parameter { ordinal }
            | SymbolEdge::Return { ordinal }
            | SymbolEdge::Field { ordinal, .. } => *ordinal,
            _ => 0,
        }
    }
}

impl fmt::Display for SymbolEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolEdge::Route { ordinal } => write!(f, "route[{}]", ordinal),
            SymbolEdge::Parameter { ordinal } => write!(f, "param[{}]", ordinal),
            SymbolEdge::Return { ordinal } => write!(f, "return[{}]", ordinal),
            SymbolEdge::TypeOf => write!(f, "type"),
            SymbolEdge::Field { name, .. } => write!(f, "field {}", name),
            SymbolEdge::Underlying => write!(f, "underlying"),
            SymbolEdge::References => write!(f, "refs"),
        }
    }
}

/// Expansion state of a model declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    InProgress,
    Complete,
    Failed,
}

/// The graph plus its deduplication indexes.
#[derive(Debug, Default)]
pub struct SymbolGraph {
    graph: DiGraph<SymbolNode, SymbolEdge>,
    types: HashMap<TypeMetadata, NodeIndex>,
    models: HashMap<DeclId, (NodeIndex, ModelState)>,
    controllers: Vec<NodeIndex>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &DiGraph<SymbolNode, SymbolEdge> {
        &self.graph
    }

    pub fn node(&self, idx: NodeIndex) -> &SymbolNode {
        &self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn add_controller(&mut self, controller: ControllerNode) -> NodeIndex {
        let idx = self.graph.add_node(SymbolNode::Controller(controller));
        self.controllers.push(idx);
        idx
    }

    pub fn add_route(&mut self, controller: NodeIndex, ordinal: usize, route: RouteNode) -> NodeIndex {
        let idx = self.graph.add_node(SymbolNode::Route(route));
        self.graph.add_edge(controller, idx, SymbolEdge::Route { ordinal });
        idx
    }

    pub fn add_parameter(&mut self, route: NodeIndex, param: ParamNode) -> NodeIndex {
        let ordinal = param.ordinal;
        let idx = self.graph.add_node(SymbolNode::Parameter(param));
        self.graph.add_edge(route, idx, SymbolEdge::Parameter { ordinal });
        idx
    }

    pub fn add_return(&mut self, route: NodeIndex, ret: ReturnNode) -> NodeIndex {
        let ordinal = ret.ordinal;
        let idx = self.graph.add_node(SymbolNode::ReturnValue(ret));
        self.graph.add_edge(route, idx, SymbolEdge::Return { ordinal });
        idx
    }

    /// The canonical node for `ty`, created on first use.
    pub fn intern_type(&mut self, ty: &TypeMetadata) -> NodeIndex {
        if let Some(idx) = self.types.get(ty) {
            return *idx;
        }
        let idx = self.graph.add_node(SymbolNode::Type(ty.clone()));
        self.types.insert(ty.clone(), idx);
        idx
    }

    /// Add an edge, or replace the weight of an existing edge between the
    /// same endpoints.
    pub fn link(&mut self, from: NodeIndex, to: NodeIndex, edge: SymbolEdge) {
        self.graph.update_edge(from, to, edge);
    }

    /// Add an edge even if one between the endpoints exists.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: SymbolEdge) {
        self.graph.add_edge(from, to, edge);
    }

    pub fn model_entry(&self, id: &DeclId) -> Option<(NodeIndex, ModelState)> {
        self.models.get(id).copied()
    }

    /// Register a model as under construction.
    pub fn begin_model(&mut self, node: ModelNode) -> NodeIndex {
        let id = node.id.clone();
        let idx = self.graph.add_node(SymbolNode::Model(node));
        self.models.insert(id, (idx, ModelState::InProgress));
        idx
    }

    pub fn complete_model(&mut self, idx: NodeIndex, metadata: ModelMetadata) {
        if let SymbolNode::Model(node) = &mut self.graph[idx] {
            self.models
                .insert(node.id.clone(), (idx, ModelState::Complete));
            node.metadata = Some(metadata);
        }
    }

    pub fn fail_model(&mut self, id: &DeclId) {
        if let Some(entry) = self.models.get_mut(id) {
            entry.1 = ModelState::Failed;
        }
    }

    /// Controllers sorted by identity.
    pub fn controllers(&self) -> Vec<(NodeIndex, &ControllerNode)> {
        let mut out: Vec<_> = self
            .controllers
            .iter()
            .filter_map(|&idx| match &self.graph[idx] {
                SymbolNode::Controller(c) => Some((idx, c)),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.1.id.cmp(&b.1.id));
        out
    }

    /// Outgoing children of `idx` with their edge, sorted by ordinal.
    fn children(&self, idx: NodeIndex) -> Vec<(usize, NodeIndex, &SymbolEdge)> {
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.weight().ordinal(), e.target(), e.weight()))
            .collect();
        out.sort_by_key(|(ordinal, target, _)| (*ordinal, target.index()));
        out
    }

    pub fn routes(&self, controller: NodeIndex) -> Vec<(NodeIndex, &RouteNode)> {
        self.children(controller)
            .into_iter()
            .filter_map(|(_, idx, _)| match &self.graph[idx] {
                SymbolNode::Route(r) => Some((idx, r)),
                _ => None,
            })
            .collect()
    }

    pub fn parameters(&self, route: NodeIndex) -> Vec<(NodeIndex, &ParamNode)> {
        self.children(route)
            .into_iter()
            .filter_map(|(_, idx, _)| match &self.graph[idx] {
                SymbolNode::Parameter(p) => Some((idx, p)),
                _ => None,
            })
            .collect()
    }

    pub fn returns(&self, route: NodeIndex) -> Vec<(NodeIndex, &ReturnNode)> {
        self.children(route)
            .into_iter()
            .filter_map(|(_, idx, _)| match &self.graph[idx] {
                SymbolNode::ReturnValue(r) => Some((idx, r)),
                _ => None,
            })
            .collect()
    }

    /// The canonical type node a parameter or return value points at.
    pub fn type_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| *e.weight() == SymbolEdge::TypeOf)
            .map(|e| e.target())
    }

    /// Every canonical type node, sorted by name then identity fields.
    pub fn type_nodes(&self) -> Vec<(NodeIndex, &TypeMetadata)> {
        let mut out: Vec<_> = self.types.iter().map(|(ty, &idx)| (idx, ty)).collect();
        out.sort_by(|a, b| type_sort_key(a.1).cmp(&type_sort_key(b.1)));
        out
    }

    /// Canonical node for a type, if present.
    pub fn type_index(&self, ty: &TypeMetadata) -> Option<NodeIndex> {
        self.types.get(ty).copied()
    }

    /// Every model node, sorted by identity.
    pub fn models(&self) -> Vec<(NodeIndex, &ModelNode)> {
        let mut out: Vec<_> = self
            .models
            .values()
            .filter_map(|&(idx, _)| match &self.graph[idx] {
                SymbolNode::Model(m) => Some((idx, m)),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.1.id.cmp(&b.1.id));
        out
    }

    /// Models transitively reachable from the given nodes through type
    /// references, fields and alias targets. Sorted by identity.
    pub fn reachable_models(&self, roots: &[NodeIndex]) -> Vec<(NodeIndex, &ModelNode)> {
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = roots.iter().copied().collect();
        let mut found = Vec::new();

        while let Some(idx) = queue.pop_front() {
            if !seen.insert(idx) {
                continue;
            }
            if let SymbolNode::Model(m) = &self.graph[idx] {
                found.push((idx, m));
            }
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                match edge.weight() {
                    SymbolEdge::TypeOf
                    | SymbolEdge::References
                    | SymbolEdge::Field { .. }
                    | SymbolEdge::Underlying => queue.push_back(edge.target()),
                    _ => {}
                }
            }
        }

        found.sort_by(|a, b| a.1.id.cmp(&b.1.id));
        found
    }
}

fn type_sort_key(ty: &TypeMetadata) -> (String, String, &'static str, String) {
    (
        ty.name.clone(),
        ty.package_path.clone(),
        ty.symbol_kind.as_str(),
        format!("{:?}", ty.import_kind),
    )
}

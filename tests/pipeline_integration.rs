//! Integration tests for the full build -> validate -> reduce pipeline.
//!
//! These run against the `testdata/shop` Go module, which is expected to
//! analyze cleanly (no error diagnostics).

mod common;

use std::sync::Arc;

use routescan::analysis::AnalysisContext;
use routescan::cache::MetadataCache;
use routescan::config::Config;
use routescan::diagnostics::Severity;
use routescan::graph::GraphBuilder;
use routescan::metadata::{HttpVerb, ParamLocation, SymbolKind};
use routescan::pipeline::Pipeline;
use routescan::reduce::reduce;

use common::{all_diagnostics, shop_path};

fn shop_pipeline() -> Pipeline {
    Pipeline::new(shop_path(), Config::default())
}

#[test]
fn test_shop_runs_cleanly() {
    let mut pipeline = shop_pipeline();
    let metadata = pipeline.run().expect("shop should analyze without errors");

    let names: Vec<_> = metadata.controllers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["OwnersController", "WidgetsController"]);

    let widgets = &metadata.controllers[1];
    assert_eq!(widgets.tag.as_deref(), Some("Widgets"));
    let routes: Vec<_> = widgets
        .routes
        .iter()
        .map(|r| (r.operation_id.as_str(), r.verb, r.path.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("GetWidget", Some(HttpVerb::Get), "/widgets/{id}"),
            ("SetTags", Some(HttpVerb::Post), "/widgets/{id}/tags"),
            ("ListWidgets", Some(HttpVerb::Get), "/widgets"),
        ]
    );
}

#[test]
fn test_route_details_are_flattened() {
    let mut pipeline = shop_pipeline();
    let metadata = pipeline.run().unwrap();
    let widgets = &metadata.controllers[1];

    let get = &widgets.routes[0];
    assert_eq!(get.params.len(), 2);
    assert!(get.params[0].is_context);
    assert_eq!(get.params[0].location, None);
    assert_eq!(get.params[1].location, Some(ParamLocation::Path));
    assert_eq!(get.params[1].validator.as_deref(), Some("required,uuid"));
    assert_eq!(get.params[1].description, "The widget identifier");
    assert_eq!(get.returns[0].ty.name, "*Widget");
    assert!(get.returns[0].ty.is_by_reference);
    assert!(get.returns[1].is_error);
    assert_eq!(get.content_types, vec!["application/json".to_string()]);
    // Controller default security applies.
    assert_eq!(get.security[0].scopes, vec!["widgets:read".to_string()]);

    let set_tags = &widgets.routes[1];
    assert_eq!(set_tags.params[1].location, Some(ParamLocation::Body));
    assert_eq!(set_tags.security[0].scopes, vec!["widgets:write".to_string()]);
    assert!(set_tags.returns[1].is_structured_error);

    let list = &widgets.routes[2];
    assert_eq!(list.params[0].wire_name, "state");
    assert_eq!(list.description, "ListWidgets returns every widget in a given state.");
    assert_eq!(list.params[0].ty.symbol_kind, SymbolKind::Enum);
}

#[test]
fn test_models_closure() {
    let mut pipeline = shop_pipeline();
    let metadata = pipeline.run().unwrap();

    let structs: Vec<_> = metadata
        .models
        .structs
        .iter()
        .map(|s| s.id.name.as_str())
        .collect();
    assert_eq!(structs, vec!["Owner", "Rfc7807Error", "Widget"]);

    let enums: Vec<_> = metadata.models.enums.iter().map(|e| e.id.name.as_str()).collect();
    assert_eq!(enums, vec!["Status"]);
    let values: Vec<_> = metadata.models.enums[0]
        .values
        .iter()
        .map(|v| v.value.as_str())
        .collect();
    assert_eq!(values, vec!["active", "retired"]);

    // Labels is declared but never referenced by a route.
    assert!(metadata.models.aliases.is_empty());
    assert!(metadata.has_error_type_references);
}

#[test]
fn test_struct_fields_follow_json_tags() {
    let mut pipeline = shop_pipeline();
    let metadata = pipeline.run().unwrap();
    let widget = metadata
        .models
        .structs
        .iter()
        .find(|s| s.id.name == "Widget")
        .unwrap();

    let fields: Vec<_> = widget.fields.iter().map(|f| f.json_name.as_str()).collect();
    assert_eq!(
        fields,
        vec!["id", "name", "status", "tags", "parent", "owner", "createdAt"]
    );
    assert_eq!(widget.description, "A sellable item");
    assert_eq!(widget.fields[0].validator.as_deref(), Some("required,uuid"));
    assert_eq!(widget.fields[0].description, "Stable identifier");
    assert!(widget.fields[2].deprecated);
    assert_eq!(widget.fields[4].ty.name, "*Widget");
    assert_eq!(widget.fields[6].ty.symbol_kind, SymbolKind::Special);
}

#[test]
fn test_mutually_recursive_models_terminate() {
    let mut pipeline = shop_pipeline();
    let graph = pipeline.generate_graph().unwrap();

    let models: Vec<_> = graph.models().into_iter().map(|(_, m)| m.id.name.clone()).collect();
    assert!(models.contains(&"Widget".to_string()));
    assert!(models.contains(&"Owner".to_string()));
    assert!(graph.models().iter().all(|(_, m)| m.metadata.is_some()));
}

#[test]
fn test_composite_types_are_deduplicated() {
    let mut pipeline = shop_pipeline();
    let graph = pipeline.generate_graph().unwrap();

    let count = |name: &str| {
        graph
            .type_nodes()
            .into_iter()
            .filter(|(_, ty)| ty.name == name)
            .count()
    };
    // Used by SetTags (param and return), Stats and Widget.Tags.
    assert_eq!(count("map[string]int"), 1);
    assert_eq!(count("map[string]string"), 1);
}

#[test]
fn test_only_warnings_and_below_on_shop() {
    let mut pipeline = shop_pipeline();
    pipeline.generate_graph().unwrap();
    let entities = pipeline.validate().unwrap();

    let errors: Vec<_> = all_diagnostics(&entities)
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[test]
fn test_build_is_independent_of_file_order() {
    let root = shop_path();
    let config = Config::default();
    let filter = config.path_filter().unwrap();

    let forward_ctx = AnalysisContext::new(&root);
    let files = forward_ctx.scan(&filter);
    let forward_cache = MetadataCache::new();
    let forward = GraphBuilder::new(&forward_ctx, &forward_cache, &config)
        .build(&files)
        .unwrap();

    let reverse_ctx = AnalysisContext::new(&root);
    let mut reversed = reverse_ctx.scan(&filter);
    reversed.reverse();
    let reverse_cache = MetadataCache::new();
    let reverse = GraphBuilder::new(&reverse_ctx, &reverse_cache, &config)
        .build(&reversed)
        .unwrap();

    assert_eq!(forward.dump_text(), reverse.dump_text());
    assert_eq!(forward.type_nodes().len(), reverse.type_nodes().len());
    assert_eq!(forward.node_counts(), reverse.node_counts());
}

#[test]
fn test_reduce_is_idempotent() {
    let mut pipeline = shop_pipeline();
    pipeline.generate_graph().unwrap();
    let graph = pipeline.graph().unwrap();

    let first = reduce(graph, pipeline.config(), pipeline.cache());
    let second = reduce(graph, pipeline.config(), pipeline.cache());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_hidden_routes_excluded_when_configured() {
    let config = Config {
        exclude_hidden_routes: true,
        ..Config::default()
    };
    let mut pipeline = Pipeline::new(shop_path(), config);
    let metadata = pipeline.run().unwrap();

    let owners = &metadata.controllers[0];
    let ops: Vec<_> = owners.routes.iter().map(|r| r.operation_id.as_str()).collect();
    assert_eq!(ops, vec!["Stats", "Labels"]);
}

#[test]
fn test_dumps() {
    let mut pipeline = shop_pipeline();
    pipeline.generate_graph().unwrap();

    let dot = pipeline.dump_dot().unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("controller WidgetsController"));

    let text = pipeline.dump_text().unwrap();
    assert!(text.contains("controller example.com/shop/controllers.WidgetsController"));
    assert!(text.contains("  route GetWidget GET /widgets/{id}"));
    assert!(text.contains("    param 1 path id: string"));
    assert!(text.contains("struct example.com/shop/models.Widget"));
}

#[test]
fn test_shared_cache_is_reused_across_runs() {
    let cache = Arc::new(MetadataCache::new());

    let mut first = shop_pipeline().with_cache(Arc::clone(&cache));
    let expected = first.run().unwrap();
    assert!(!cache.is_empty());
    let hits_before = cache.stats().hits;

    let mut second = shop_pipeline().with_cache(Arc::clone(&cache));
    let actual = second.run().unwrap();
    assert!(cache.stats().hits > hits_before);
    assert_eq!(expected, actual);
}

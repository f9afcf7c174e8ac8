//! Integration tests for metadata cache reuse and invalidation across runs.

mod common;

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use routescan::cache::MetadataCache;
use routescan::config::Config;
use routescan::metadata::DeclId;
use routescan::pipeline::Pipeline;
use routescan::reduce::ReducedMetadata;

use common::{project, write, MODULE};

const CONTROLLER: &str = r#"package api

import (
	"example.com/app/base"
	"example.com/app/models"
)

// ItemsController serves items.
// @Tag(Items)
// @Route(/items)
type ItemsController struct {
	base.ControllerBase
}

// @Method(GET)
// @Route(/{id})
// @Path(id)
// @Description Fetch one item
func (c *ItemsController) Get(id string) (*models.Item, error) {
	return nil, nil
}
"#;

const ITEM_V1: &str = r#"package models

// Item is a stocked product.
type Item struct {
	SKU  string `json:"sku"`
	Name string `json:"name"`
}
"#;

const ITEM_V2: &str = r#"package models

// Item is a stocked product.
type Item struct {
	SKU   string `json:"sku"`
	Name  string `json:"name"`
	Price int    `json:"price"`
}
"#;

const ITEM_WITH_KIND: &str = r#"package models

// Item is a stocked product.
type Item struct {
	SKU  string `json:"sku"`
	Kind Kind   `json:"kind"`
}
"#;

const KIND_V1: &str = r#"package models

// Kind groups items.
type Kind string

const (
	KindA Kind = "a"
)
"#;

const KIND_V2: &str = r#"package models

// Kind groups items.
type Kind string

const (
	KindA Kind = "a"
	KindB Kind = "b"
)
"#;

fn item_id() -> DeclId {
    DeclId::new(format!("{}/models", MODULE), "Item")
}

fn run(root: &Path, cache: &Arc<MetadataCache>) -> ReducedMetadata {
    Pipeline::new(root, Config::default())
        .with_cache(Arc::clone(cache))
        .run()
        .expect("project should analyze cleanly")
}

fn item_fields(metadata: &ReducedMetadata) -> Vec<String> {
    metadata.models.structs[0]
        .fields
        .iter()
        .map(|f| f.json_name.clone())
        .collect()
}

#[test]
fn test_unchanged_files_hit_the_cache() {
    let temp = project(&[("api/items.go", CONTROLLER), ("models/item.go", ITEM_V1)]);
    let cache = Arc::new(MetadataCache::new());

    let first = run(temp.path(), &cache);
    assert_eq!(cache.stats().hits, 0);
    assert!(cache.get(&item_id()).is_some());

    let second = run(temp.path(), &cache);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(first, second);
}

#[test]
fn test_content_change_with_preserved_mtime_invalidates() {
    let temp = project(&[("api/items.go", CONTROLLER), ("models/item.go", ITEM_V1)]);
    let item_path = temp.path().join("models/item.go");
    let cache = Arc::new(MetadataCache::new());

    let first = run(temp.path(), &cache);
    assert_eq!(item_fields(&first), vec!["sku", "name"]);
    let (_, cached_version) = cache.get(&item_id()).unwrap();

    // Rewrite the file and put its old timestamp back.
    let mtime = fs::metadata(&item_path).unwrap().modified().unwrap();
    write(temp.path(), "models/item.go", ITEM_V2);
    File::options()
        .write(true)
        .open(&item_path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();

    let second = run(temp.path(), &cache);
    assert_eq!(item_fields(&second), vec!["sku", "name", "price"]);
    assert_eq!(cache.stats().invalidations, 1);

    let (_, refreshed) = cache.get(&item_id()).unwrap();
    assert_eq!(refreshed.modified, cached_version.modified);
    assert_ne!(refreshed.hash, cached_version.hash);
}

fn kind_field_values(metadata: &ReducedMetadata) -> Vec<String> {
    let item = metadata
        .models
        .structs
        .iter()
        .find(|s| s.id.name == "Item")
        .unwrap();
    let kind = item.fields.iter().find(|f| f.json_name == "kind").unwrap();
    kind.ty.alias.as_ref().unwrap().values.clone()
}

#[test]
fn test_change_in_a_referenced_file_reaches_cached_models() {
    let temp = project(&[
        ("api/items.go", CONTROLLER),
        ("models/item.go", ITEM_WITH_KIND),
        ("models/kind.go", KIND_V1),
    ]);
    let cache = Arc::new(MetadataCache::new());

    let first = run(temp.path(), &cache);
    assert_eq!(kind_field_values(&first), vec!["a"]);

    // Only the enum's file changes; item.go still hits the cache.
    write(temp.path(), "models/kind.go", KIND_V2);
    let second = run(temp.path(), &cache);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(kind_field_values(&second), vec!["a", "b"]);
    let values: Vec<_> = second.models.enums[0]
        .values
        .iter()
        .map(|v| v.value.as_str())
        .collect();
    assert_eq!(values, vec!["a", "b"]);

    let fresh = run(temp.path(), &Arc::new(MetadataCache::new()));
    assert_eq!(second, fresh);

    // The refreshed struct replaces the stale entry.
    let third = run(temp.path(), &cache);
    assert_eq!(kind_field_values(&third), vec!["a", "b"]);
}

#[test]
fn test_touch_without_content_change_still_hits() {
    let temp = project(&[("api/items.go", CONTROLLER), ("models/item.go", ITEM_V1)]);
    let item_path = temp.path().join("models/item.go");
    let cache = Arc::new(MetadataCache::new());
    run(temp.path(), &cache);

    let later = fs::metadata(&item_path).unwrap().modified().unwrap()
        + std::time::Duration::from_secs(60);
    File::options()
        .write(true)
        .open(&item_path)
        .unwrap()
        .set_modified(later)
        .unwrap();

    run(temp.path(), &cache);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().invalidations, 0);
}

#[test]
fn test_persisted_cache_round_trip() {
    let temp = project(&[("api/items.go", CONTROLLER), ("models/item.go", ITEM_V1)]);
    let cache_path = temp.path().join(".routescan/cache.json");

    let cache = Arc::new(MetadataCache::new());
    let first = run(temp.path(), &cache);
    cache.save(&cache_path).unwrap();

    let loaded = Arc::new(MetadataCache::load(&cache_path));
    assert_eq!(loaded.len(), cache.len());
    let second = run(temp.path(), &loaded);
    assert_eq!(loaded.stats().hits, 1);
    assert_eq!(first, second);
}

#[test]
fn test_corrupt_cache_file_is_ignored() {
    let temp = project(&[("api/items.go", CONTROLLER), ("models/item.go", ITEM_V1)]);
    write(temp.path(), "cache.json", "{ not json");

    let cache = Arc::new(MetadataCache::load(&temp.path().join("cache.json")));
    assert!(cache.is_empty());
    let metadata = run(temp.path(), &cache);
    assert_eq!(item_fields(&metadata), vec!["sku", "name"]);
}

//! Content-addressed cache for expanded model metadata.
//!
//! Entries are keyed by declaration identity (package path + name) and carry
//! the `FileVersion` of the declaring file. An entry is only reused while
//! that file's current version has not changed; otherwise it is dropped and
//! the caller recomputes.

mod version;

pub use version::FileVersion;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metadata::{DeclId, ModelMetadata};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    id: DeclId,
    metadata: ModelMetadata,
    version: FileVersion,
}

/// Hit/miss counters for a cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

/// In-memory metadata cache, optionally persisted as JSON between runs.
#[derive(Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<DeclId, CacheEntry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    invalidations: AtomicUsize,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached metadata and the version it was computed from.
    pub fn get(&self, id: &DeclId) -> Option<(ModelMetadata, FileVersion)> {
        let entries = self.entries.read().ok()?;
        entries
            .get(id)
            .map(|entry| (entry.metadata.clone(), entry.version.clone()))
    }

    pub fn put(&self, id: DeclId, metadata: ModelMetadata, version: FileVersion) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                id.clone(),
                CacheEntry {
                    id,
                    metadata,
                    version,
                },
            );
        }
    }

    /// Cached metadata for `id`, provided the declaring file is unchanged.
    ///
    /// `current` is the version the caller just observed. When it is `None`
    /// (the file could not be fingerprinted) the lookup is a miss. A changed
    /// file invalidates the entry.
    pub fn get_fresh(&self, id: &DeclId, current: Option<&FileVersion>) -> Option<ModelMetadata> {
        let Some(current) = current else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match self.get(id) {
            Some((metadata, cached)) if !cached.has_changed(current) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(decl = %id, "metadata cache hit");
                Some(metadata)
            }
            Some(_) => {
                debug!(decl = %id, file = %current.path.display(), "file changed, invalidating cache entry");
                self.invalidate(id);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn invalidate(&self, id: &DeclId) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.remove(id).is_some() {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Load a cache previously written with [`MetadataCache::save`].
    ///
    /// A missing or unreadable file yields an empty cache.
    pub fn load(path: &Path) -> Self {
        let cache = Self::new();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return cache,
        };
        match serde_json::from_str::<Vec<CacheEntry>>(&content) {
            Ok(stored) => {
                if let Ok(mut entries) = cache.entries.write() {
                    for entry in stored {
                        entries.insert(entry.id.clone(), entry);
                    }
                }
                debug!(path = %path.display(), entries = cache.len(), "loaded metadata cache");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring corrupt metadata cache"),
        }
        cache
    }

    /// Persist all entries as JSON, sorted by identity.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut stored: Vec<CacheEntry> = self
            .entries
            .read()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        stored.sort_by(|a, b| a.id.cmp(&b.id));

        let json = serde_json::to_string_pretty(&stored)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)
    }
}

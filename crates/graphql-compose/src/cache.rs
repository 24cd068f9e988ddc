//! Compiled schema caching.
//!
//! Composed schemas are cached under the fingerprint of the configuration
//! that produced them. Every entry carries tags naming the entity types and
//! extensions it was built from, so a change to one of them can drop exactly
//! the affected entries.
//!
//! ## Example
//!
//! ```ignore
//! let cache = MemorySchemaCache::new();
//!
//! cache.put(&fingerprint, schema, &tags);
//! assert!(cache.get(&fingerprint).is_some());
//!
//! // An extension changed
//! cache.invalidate_tags(&["extension:menus".to_string()]);
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::composer::ComposedSchema;

/// Tag carried by every cached schema.
pub const SCHEMA_TAG: &str = "graphql_compose:schema";

/// Tag for schemas built with an entity type.
pub fn entity_type_tag(id: &str) -> String {
    format!("entity_type:{id}")
}

/// Tag for schemas built with an extension.
pub fn extension_tag(id: &str) -> String {
    format!("extension:{id}")
}

/// Storage for composed schemas.
pub trait SchemaCache: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<Arc<ComposedSchema>>;

    fn put(&self, fingerprint: &str, schema: Arc<ComposedSchema>, tags: &[String]);

    /// Drops every entry carrying one of the tags. Returns the number of
    /// entries removed.
    fn invalidate_tags(&self, tags: &[String]) -> usize;

    fn clear(&self);
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSchemaCache;

impl SchemaCache for NoopSchemaCache {
    fn get(&self, _fingerprint: &str) -> Option<Arc<ComposedSchema>> {
        None
    }

    fn put(&self, _fingerprint: &str, _schema: Arc<ComposedSchema>, _tags: &[String]) {}

    fn invalidate_tags(&self, _tags: &[String]) -> usize {
        0
    }

    fn clear(&self) {}
}

struct CacheEntry {
    schema: Arc<ComposedSchema>,
    tags: BTreeSet<String>,
}

/// In-process schema cache.
pub struct MemorySchemaCache {
    entries: DashMap<String, CacheEntry>,
    stats: Arc<CacheStatistics>,
}

impl std::fmt::Debug for MemorySchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySchemaCache")
            .field("size", &self.entries.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl Default for MemorySchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySchemaCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            stats: Arc::new(CacheStatistics::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStatistics {
        &self.stats
    }
}

impl SchemaCache for MemorySchemaCache {
    fn get(&self, fingerprint: &str) -> Option<Arc<ComposedSchema>> {
        match self.entries.get(fingerprint) {
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.schema))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, fingerprint: &str, schema: Arc<ComposedSchema>, tags: &[String]) {
        let entry = CacheEntry {
            schema,
            tags: tags.iter().cloned().collect(),
        };
        if self.entries.insert(fingerprint.to_string(), entry).is_none() {
            self.stats.size.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint, tags = tags.len(), "Cached composed schema");
    }

    fn invalidate_tags(&self, tags: &[String]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !tags.iter().any(|tag| entry.tags.contains(tag)));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            self.stats.size.fetch_sub(removed, Ordering::Relaxed);
            self.stats
                .invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Invalidated cached schemas");
        }
        removed
    }

    fn clear(&self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.size.store(0, Ordering::Relaxed);
        self.stats
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Default)]
pub struct CacheStatistics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    /// Entries removed by tag invalidation or clearing.
    pub invalidations: AtomicU64,
    pub size: AtomicUsize,
}

impl CacheStatistics {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;

        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
        }
    }
}

/// Point-in-time copy of [`CacheStatistics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub invalidations: u64,
    pub size: usize,
    pub hit_ratio: f64,
}

//! # Schema Registry
//!
//! Subject → fully-qualified Schema ID cache, filled lazily by resolution.
//!
//! Entries are never invalidated for the lifetime of a table snapshot; a
//! version switch clears the whole registry. Two message types sharing one
//! subject will both classify as whichever resolved first.
//!
//! The lock covers only the map lookup and insert. Resolution on a miss runs
//! outside it, so two threads may resolve the same new subject at once; the
//! second insert overwrites the first with the same value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Thread-safe subject cache with hit/resolution counters.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: Mutex<HashMap<String, String>>,
    resolutions: AtomicU64,
    hits: AtomicU64,
}

impl SchemaRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached ID for `subject`.
    pub fn get(&self, subject: &str) -> Option<String> {
        self.entries.lock().get(subject).cloned()
    }

    /// Cache an ID, replacing any previous entry.
    pub fn insert(&self, subject: impl Into<String>, schema_id: impl Into<String>) {
        self.entries.lock().insert(subject.into(), schema_id.into());
    }

    /// Cached ID for `subject`, or the result of `resolve`, cached on
    /// success. Empty subjects are resolved every time and never cached.
    ///
    /// # Errors
    ///
    /// Propagates the error from `resolve`; nothing is cached on failure.
    pub fn get_or_resolve<E>(
        &self,
        subject: &str,
        resolve: impl FnOnce() -> Result<String, E>,
    ) -> Result<String, E> {
        if !subject.is_empty() {
            if let Some(id) = self.get(subject) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(subject, schema_id = %id, "schema registry hit");
                return Ok(id);
            }
        }

        let id = resolve()?;
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        debug!(subject, schema_id = %id, "schema registry miss; resolved");
        if !subject.is_empty() {
            self.insert(subject, id.clone());
        }
        Ok(id)
    }

    /// Number of cached subjects.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Successful resolutions performed on cache misses.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Lookups answered from the cache.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

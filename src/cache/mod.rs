//! Caching subsystem.
//!
//! - [`ResponseCache`]: bounded in-memory store of GET responses, keyed on
//!   [`CacheKey`]. Freshness is decided per read from the governing
//!   [`CachePolicy`], not by the store itself, so one entry can be fresh
//!   under one policy table and stale under another.
//!
//! - [`PendingRequests`]: single-flight registry of in-flight GETs.
//!
//! - [`PolicyTable`]: prefix → TTL / stale-while-revalidate configuration.
//!
//! Entries are immutable once stored. Revalidation swaps in a whole new
//! [`CacheEntry`]; nothing updates an entry in place.

pub mod key;
pub mod pending;
pub mod policy;

pub use key::CacheKey;
pub use pending::{Flight, PendingRequests, SharedFetch};
pub use policy::{CachePolicy, Freshness, PolicyTable, path_has_prefix};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::types::ApiResponse;

/// Default maximum number of entries in the response cache.
pub const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// One stored response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: ApiResponse<Value>,
    /// When the response was received (tokio clock).
    pub stored_at: Instant,
    /// Validator for conditional revalidation.
    pub etag: Option<String>,
}

impl CacheEntry {
    pub fn new(data: ApiResponse<Value>, etag: Option<String>) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            etag,
        }
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Copy of this entry confirmed current by the server (HTTP 304).
    pub fn revalidated(&self) -> Self {
        Self {
            data: self.data.clone(),
            stored_at: Instant::now(),
            etag: self.etag.clone(),
        }
    }
}

/// Thread-safe bounded store for cached responses.
///
/// Uses a moka LRU to cap memory in long-running processes; expiry is
/// handled by the caller via [`CachePolicy::freshness`].
pub struct ResponseCache {
    entries: moka::sync::Cache<CacheKey, Arc<CacheEntry>>,
}

impl ResponseCache {
    /// Create an empty cache with the default max capacity (1,000).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with a custom max capacity.
    pub fn with_max_entries(max: u64) -> Self {
        Self {
            entries: moka::sync::Cache::new(max),
        }
    }

    /// Returns `None` on cache miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key)
    }

    /// Insert (or replace) the entry for `key`.
    pub fn insert(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        self.entries.insert(key, entry);
    }

    /// Remove every entry whose endpoint falls under `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.invalidate_matching(|key| path_has_prefix(key.endpoint(), prefix))
    }

    /// Remove every entry whose key satisfies `predicate`.
    pub fn invalidate_matching<P: Fn(&CacheKey) -> bool>(&self, predicate: P) -> usize {
        let doomed: Vec<Arc<CacheKey>> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key)
            .collect();
        for key in &doomed {
            self.entries.invalidate(key.as_ref());
        }
        doomed.len()
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

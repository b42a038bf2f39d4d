//! Key/value cache used for expensive aggregate queries.
//!
//! Values are stored serialized (`serde_json::Value`) so a `CacheStore` can be
//! backed by something outside the process; `MemoryCache` keeps them in a
//! mutex-guarded map with per-entry expiry.

use crate::db::Database;
use crate::types::CategoryStatistics;
use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Storage backend for cached values.
pub trait CacheStore: Send + Sync {
    /// Fetch a value that has not expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value for `ttl`.
    fn put(&self, key: &str, value: Value, ttl: Duration);

    /// Remove a value. Returns `true` if an entry was present.
    fn forget(&self, key: &str) -> bool;
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache with TTL expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    fn forget(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }
}

/// Return the cached value for `key`, or compute, store and return it.
///
/// A cached value that no longer deserializes into `T` is treated as a miss.
pub fn remember<T, F>(store: &dyn CacheStore, key: &str, ttl: Duration, compute: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    if let Some(cached) = store.get(key) {
        match serde_json::from_value::<T>(cached) {
            Ok(value) => {
                debug!(key, "Cache hit");
                return Ok(value);
            }
            Err(e) => warn!(key, error = %e, "Discarding undecodable cache entry"),
        }
    }

    debug!(key, "Cache miss, recomputing");
    let value = compute()?;
    store.put(key, serde_json::to_value(&value)?, ttl);
    Ok(value)
}

/// Cache entry holding the category statistics report.
pub struct CategoryStatsCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CategoryStatsCache {
    /// Single key for this dataset; bump the version when the shape changes.
    pub const KEY: &'static str = "cat_stats_v1";

    /// Default time to live.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// In-memory store with the default TTL.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()), Self::DEFAULT_TTL)
    }

    /// Cached statistics, computed from the database on a miss.
    pub fn remember(&self, db: &Database) -> Result<CategoryStatistics> {
        remember(self.store.as_ref(), Self::KEY, self.ttl, || {
            db.compute_category_statistics()
        })
    }

    /// Whether a live entry is currently cached.
    pub fn is_cached(&self) -> bool {
        self.store.get(Self::KEY).is_some()
    }

    /// Drop the cached statistics.
    pub fn forget(&self) -> bool {
        self.store.forget(Self::KEY)
    }
}

//! Client-side query cache keyed by [`QueryKey`].
//!
//! Values are stored as JSON so a single cache can hold every response type.
//! Entries go stale either explicitly (invalidation after a mutation) or after
//! the configured stale time; stale entries stay readable until replaced.

mod key;

pub use key::QueryKey;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ApiError, Result};

const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    updated_at: Instant,
    invalidated: bool,
}

/// Thread-safe store of cached query results.
#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_stale_time(DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_time,
        }
    }

    /// Cached value for `key`, stale or not.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Cached value for `key` only if it is still fresh.
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        if self.is_stale(key) {
            return None;
        }
        self.get(key)
    }

    /// Cached value for `key` if it is valid and younger than `max_age`.
    ///
    /// For queries whose freshness window differs from the cache default,
    /// such as the slow-moving tag and category lists.
    pub fn get_within<T: DeserializeOwned>(&self, key: &QueryKey, max_age: Duration) -> Option<T> {
        if self.is_older_than(key, max_age) {
            return None;
        }
        self.get(key)
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key,
                CacheEntry {
                    value,
                    updated_at: Instant::now(),
                    invalidated: false,
                },
            );
        Ok(())
    }

    /// Modify a cached value in place and return the previous value.
    ///
    /// Returns `Ok(None)` and leaves the cache untouched when `key` is absent.
    /// An invalidated entry stays invalidated: a local patch does not make
    /// the rest of the value fresh, so the next read still refetches.
    pub fn update<T, F>(&self, key: &QueryKey, apply: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };
        let previous: T = serde_json::from_value(entry.value.clone()).map_err(|e| {
            ApiError::InvalidState(format!("cached value for {key} has unexpected shape: {e}"))
        })?;
        let mut next: T = serde_json::from_value(entry.value.clone())?;
        apply(&mut next);
        entry.value = serde_json::to_value(&next)?;
        entry.updated_at = Instant::now();
        Ok(Some(previous))
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    /// Drop every entry under `prefix`. Returns how many were removed.
    pub fn remove_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix))
    }

    /// Mark every entry matching `predicate` stale.
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if predicate(key) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.is_older_than(key, self.stale_time)
    }

    fn is_older_than(&self, key: &QueryKey, max_age: Duration) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) => entry.invalidated || entry.updated_at.elapsed() >= max_age,
            None => true,
        }
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

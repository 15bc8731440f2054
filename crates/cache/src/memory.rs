use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{Cache, Result};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory cache backed by a concurrent map.
///
/// Expiry is lazy: an expired entry is dropped when it is next read.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries, including any not yet lazily
    /// expired.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Returns true if `key` matches `pattern`. A trailing `*` makes the
/// pattern a prefix match; otherwise the match is exact.
fn key_matches(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        // The read guard is released; drop the expired entry.
        self.entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn remove_by_pattern(&self, pattern: &str) -> Result<usize> {
        // Counted inside the predicate: diffing map lengths miscounts
        // when writes land concurrently with the retain.
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key_matches(key, pattern) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

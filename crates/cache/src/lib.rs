//! Cache backend interface consumed by the cache invalidation consumer,
//! plus an in-memory implementation.

pub mod error;
pub mod memory;

pub use error::{CacheError, Result};
pub use memory::InMemoryCache;

use std::time::Duration;

use async_trait::async_trait;

/// A key-value cache backend.
///
/// Values are structured JSON so cached records and listings share one
/// representation. Patterns use a trailing `*` as a prefix wildcard;
/// a pattern without `*` matches the exact key only.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Looks up a value. Expired entries are treated as absent.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Stores a value, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<()>;

    /// Removes the entry for an exact key. Removing an absent key is not
    /// an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Removes every entry whose key matches the pattern. Returns the
    /// number of entries removed.
    async fn remove_by_pattern(&self, pattern: &str) -> Result<usize>;

    /// Removes every entry.
    async fn clear_all(&self) -> Result<()>;
}

//! Cache trait, cached value and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entities::Tinylink;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cached projection of a tinylink used by the redirect fast path.
///
/// Never authoritative: it can be rebuilt from the link store at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectCacheEntry {
    pub row_id: i64,
    pub alias: String,
    pub url: String,
}

impl RedirectCacheEntry {
    /// Cache key for a link served on the public route.
    pub fn public_key(alias: &str) -> String {
        format!("public:{alias}")
    }

    /// Cache key for a private link of `owner_user_id`.
    pub fn private_key(owner_user_id: u64, alias: &str) -> String {
        format!("private:{owner_user_id}:{alias}")
    }

    /// Key under which `link` is cached.
    pub fn key_for(link: &Tinylink) -> String {
        match (link.private, link.owner.user_id()) {
            (true, Some(user_id)) => Self::private_key(user_id, &link.alias),
            _ => Self::public_key(&link.alias),
        }
    }
}

impl From<&Tinylink> for RedirectCacheEntry {
    fn from(link: &Tinylink) -> Self {
        Self {
            row_id: link.id,
            alias: link.alias.clone(),
            url: link.url.clone(),
        }
    }
}

/// Fast-path storage for redirect targets plus the alias counter.
///
/// Reads and writes are fail-open: implementations log backend errors and
/// report a miss (or success) so that the redirect degrades to the
/// authoritative store. The counter is the exception, since an alias cannot be
/// issued without it.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache
#[async_trait]
pub trait LinkCache: Send + Sync {
    /// Returns the cached entry for `key`, or `None` on miss.
    async fn get(&self, key: &str) -> CacheResult<Option<RedirectCacheEntry>>;

    /// Stores `entry` under `key` for `ttl`. Overwrites are idempotent.
    async fn set(&self, key: &str, entry: &RedirectCacheEntry, ttl: Duration) -> CacheResult<()>;

    /// Removes `key`. Evicting a missing key is not an error.
    async fn evict(&self, key: &str) -> CacheResult<()>;

    /// Atomically increments `counter_key` and returns the new value.
    ///
    /// The first call for a key returns 1.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unreachable; unlike the other
    /// operations this one is not fail-open.
    async fn atomic_increment(&self, counter_key: &str) -> CacheResult<u64>;

    /// Raises `counter_key` to at least `floor`; a higher value is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unreachable.
    async fn seed_counter(&self, counter_key: &str, floor: u64) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}

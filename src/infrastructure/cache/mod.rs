//! Caching layer for fast redirect lookups and alias counters.
//!
//! Provides a [`LinkCache`] trait with two implementations:
//! - [`RedisCache`] - Production Redis-backed cache, shared across instances
//! - [`MemoryCache`] - In-process cache for single-instance and test setups

mod memory_cache;
mod redis_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, LinkCache, RedirectCacheEntry};

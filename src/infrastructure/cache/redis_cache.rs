//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, LinkCache, RedirectCacheEntry};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Sets KEYS[1] to ARGV[1] unless it already holds a larger number.
const RAISE_COUNTER_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local floor = tonumber(ARGV[1])
if current < floor then
  redis.call('SET', KEYS[1], ARGV[1])
  return floor
end
return current
"#;

/// Redis cache for redirect entries and the alias counter.
///
/// Uses `ConnectionManager` for connection reuse and reconnects. Entries are
/// stored as JSON under a namespace prefix.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            key_prefix: "tl:".to_string(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl LinkCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<RedirectCacheEntry>> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entry) => {
                    debug!("Cache HIT: {}", key);
                    Ok(Some(entry))
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: &RedirectCacheEntry, ttl: Duration) -> CacheResult<()> {
        let ttl_seconds = ttl.as_secs();
        if ttl_seconds == 0 {
            return Ok(());
        }

        let raw = serde_json::to_string(entry)
            .map_err(|e| CacheError::OperationError(format!("encode entry: {}", e)))?;
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.set_ex::<_, _, ()>(&full_key, raw, ttl_seconds).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", key, e);
                Ok(())
            }
        }
    }

    async fn evict(&self, key: &str) -> CacheResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&full_key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache EVICT: {}", key);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", key, e);
                Ok(())
            }
        }
    }

    async fn atomic_increment(&self, counter_key: &str) -> CacheResult<u64> {
        let full_key = self.build_key(counter_key);
        let mut conn = self.client.clone();

        conn.incr::<_, _, u64>(&full_key, 1u64)
            .await
            .map_err(|e| CacheError::OperationError(format!("INCR {}: {}", counter_key, e)))
    }

    async fn seed_counter(&self, counter_key: &str, floor: u64) -> CacheResult<()> {
        let full_key = self.build_key(counter_key);
        let mut conn = self.client.clone();

        let value: u64 = redis::cmd("EVAL")
            .arg(RAISE_COUNTER_SCRIPT)
            .arg(1)
            .arg(&full_key)
            .arg(floor)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::OperationError(format!("seed {}: {}", counter_key, e)))?;

        debug!("Counter {} at {} (floor {})", counter_key, value, floor);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}

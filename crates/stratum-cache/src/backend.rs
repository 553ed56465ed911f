//! Redis backend for the shared-tier seams.
//!
//! Thin wrappers over a `deadpool-redis` pool: the store maps onto
//! GET/SETEX/DEL/SCAN, the publisher onto PUBLISH. Degradation policy lives
//! in the tiered cache, not here — these return plain `StoreError`s.

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use crate::config::DistributedSettings;
use crate::error::{CacheError, StoreError};
use crate::store::{DistributedStore, InvalidationPublisher};

/// Batch hint for SCAN, matching the pattern-clear page size of the
/// original deployment.
const SCAN_COUNT: usize = 100;

/// Build the shared connection pool from validated settings.
pub fn create_redis_pool(settings: &DistributedSettings) -> Result<Pool, CacheError> {
    let mut config = PoolConfig::from_url(&settings.url);
    let pool_config = deadpool_redis::PoolConfig {
        max_size: settings.pool_size,
        timeouts: deadpool_redis::Timeouts {
            wait: Some(Duration::from_millis(settings.timeout_ms)),
            create: Some(Duration::from_millis(settings.timeout_ms)),
            recycle: Some(Duration::from_millis(settings.timeout_ms)),
        },
        ..Default::default()
    };
    config.pool = Some(pool_config);
    config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| CacheError::Config(format!("failed to create Redis pool: {e}")))
}

/// L2 store backed by Redis strings with per-entry TTL.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DistributedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        // SETEX takes whole seconds; keep sub-second TTLs alive for 1s.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.get().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

/// Invalidation publisher backed by Redis pub/sub.
pub struct RedisPublisher {
    pool: Pool,
    channel: String,
}

impl RedisPublisher {
    pub fn new(pool: Pool, channel: String) -> Self {
        Self { pool, channel }
    }
}

#[async_trait]
impl InvalidationPublisher for RedisPublisher {
    async fn publish(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.publish::<_, _, ()>(&self.channel, key).await?;
        Ok(())
    }
}

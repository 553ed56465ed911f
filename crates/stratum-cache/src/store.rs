//! Abstract seams for the shared tier.
//!
//! The distributed store and the invalidation channel are deliberately two
//! separate traits even though the Redis deployment backs both with one
//! server: a test double (or an alternative transport) can provide one
//! without the other.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// Shared key-value store visible to all instances (the L2 tier).
///
/// Values are opaque bytes; every entry carries a server-side TTL. All
/// operations may fail with network-class errors, which callers inside this
/// crate recover from by degrading to L1-only behavior.
#[async_trait]
pub trait DistributedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Enumerate keys matching a glob-style pattern (e.g. `app:users::*`).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

/// Publisher side of the invalidation channel.
///
/// The payload is the full cache key as UTF-8, no envelope. Every instance
/// subscribed to the channel — including the publishing one — drops the key
/// from its L1 store.
#[async_trait]
pub trait InvalidationPublisher: Send + Sync {
    async fn publish(&self, key: &str) -> Result<(), StoreError>;
}

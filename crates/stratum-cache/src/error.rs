//! Error types for the cache.
//!
//! Distributed-store failures (`StoreError`) are recovered inside the tiered
//! cache and never reach the caller; the only caller-visible failures are a
//! loader's own error (`CacheError::Retrieval`) and invalid configuration
//! rejected at startup (`CacheError::Config`).

/// Boxed error used for caller-supplied loader failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-visible cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The caller-supplied loader failed while computing a missing value.
    /// Nothing was cached.
    #[error("failed to load value for cache key '{key}': {source}")]
    Retrieval {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Invalid configuration, rejected before any request is served.
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

/// Errors from the distributed store or the invalidation channel.
///
/// These never propagate past the tiered cache: every operation catches them,
/// records an error metric and degrades to its L1-only effect.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("pub/sub connection closed")]
    ChannelClosed,
}

//! Two-tier caching for horizontally scaled services.
//!
//! ## Architecture
//!
//! - **L1 (DashMap)**: in-process, microsecond latency, per-instance,
//!   bounded and write-TTL-expiring
//! - **L2 (Redis)**: network, millisecond latency, shared across instances,
//!   per-entry TTL
//! - **Pub/Sub**: cross-instance L1 invalidation on every write and removal
//!
//! ## Cache hierarchy
//!
//! ```text
//! get(category, key) -> L1 (DashMap) -> L2 (Redis) -> loader (DB/API)
//! ```
//!
//! Keys live in one flat namespace, `<prefix><category>::<raw key>`, and
//! each category carries its own L2 TTL. Writes populate both tiers and
//! broadcast the key on the invalidation channel so every instance (the
//! writer included) drops its L1 copy.
//!
//! ## Graceful degradation
//!
//! The distributed tier is an availability aid, not a dependency: every
//! Redis failure is logged, metered and absorbed, and the operation
//! completes with its L1-only effect. With `distributed.enabled = false`
//! the service is built without any Redis objects at all.
//!
//! ## Example
//!
//! ```ignore
//! let settings = CacheSettings::load(Some("cache.toml"))?;
//! let service = create_cache_service(settings)?;
//!
//! let user: Option<User> = service
//!     .get("users", "1", || async { Ok(db.find_user(1).await?) })
//!     .await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod store;
pub mod subscriber;
pub mod tiered;

pub use backend::{RedisPublisher, RedisStore, create_redis_pool};
pub use config::{CacheSettings, CategorySettings, DistributedSettings, L1Settings, L2Settings};
pub use error::{BoxError, CacheError, StoreError};
pub use local::LocalStore;
pub use manager::CacheManager;
pub use metrics::{init_metrics, render_metrics};
pub use registry::{CacheCategory, CategoryRegistry};
pub use service::{CacheService, LocalCacheService, TieredCacheService};
pub use store::{DistributedStore, InvalidationPublisher};
pub use subscriber::InvalidationListener;
pub use tiered::TieredCache;

use std::sync::Arc;

/// Build the cache service from validated settings.
///
/// With the distributed tier enabled this creates the Redis pool, the
/// manager pre-seeded with the configured categories, and spawns the
/// invalidation listener. Otherwise it returns the local-only variant,
/// which owns nothing but the L1 store.
///
/// Configuration problems fail here, at startup, never at request time.
pub fn create_cache_service(settings: CacheSettings) -> Result<CacheService, CacheError> {
    settings.validate()?;

    let l1 = Arc::new(LocalStore::new(&settings.l1));

    if !settings.distributed.enabled {
        tracing::info!("cache service starting in local-only mode (L1 only, distributed tier disabled)");
        return Ok(CacheService::Local(LocalCacheService::new(
            l1,
            settings.key_prefix,
        )));
    }

    let pool = create_redis_pool(&settings.distributed)?;
    let store = Arc::new(RedisStore::new(pool.clone()));
    let publisher = Arc::new(RedisPublisher::new(
        pool,
        settings.invalidation_channel.clone(),
    ));

    let registry = CategoryRegistry::from_settings(&settings);
    let manager = Arc::new(CacheManager::new(
        Arc::clone(&l1),
        Some(store),
        Some(publisher),
        registry,
        settings.key_prefix.clone(),
        settings.default_ttl(),
    ));

    InvalidationListener::new(
        settings.distributed.url.clone(),
        settings.invalidation_channel.clone(),
        l1,
    )
    .start();

    tracing::info!(
        channel = %settings.invalidation_channel,
        categories = manager.cache_names().len(),
        "cache service starting in tiered mode"
    );

    Ok(CacheService::Tiered(TieredCacheService::new(manager)))
}

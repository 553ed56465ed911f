//! Typed cache service facade.
//!
//! The API the rest of the application consumes: generic get-or-load, put,
//! evict, evict-many and clear, addressed by (category, key). Values cross
//! this boundary as `serde` types and are stored as MessagePack bytes, so
//! the tiers below stay value-agnostic.
//!
//! Two variants share the one contract:
//! - [`TieredCacheService`] — L1 + shared store + invalidation channel,
//!   resolved per category through the [`CacheManager`].
//! - [`LocalCacheService`] — L1 only, for single-instance deployments that
//!   want the distributed tier and pub/sub gone entirely, not just disabled.
//!
//! A cached entry that fails to decode is logged, evicted and treated as a
//! miss; a value that fails to encode is logged and simply not cached. The
//! only error surfaced to callers is a failing loader.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{BoxError, CacheError};
use crate::local::LocalStore;
use crate::manager::CacheManager;

/// Typed cache API, either tiered or local-only.
pub enum CacheService {
    Tiered(TieredCacheService),
    Local(LocalCacheService),
}

impl CacheService {
    /// Get a value, running `loader` on a total miss and caching its
    /// non-absent result. An absent loader result is returned as-is and
    /// never cached. A failing loader is the one error this facade
    /// surfaces; nothing is cached in that case.
    pub async fn get<T, F, Fut>(
        &self,
        category: &str,
        key: &str,
        loader: F,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, BoxError>>,
    {
        match self {
            Self::Tiered(service) => service.get(category, key, loader).await,
            Self::Local(service) => service.get(category, key, loader).await,
        }
    }

    /// Write a value. `None` evicts instead (nothing is ever cached for an
    /// absent value).
    pub async fn put<T: Serialize>(&self, category: &str, key: &str, value: Option<&T>) {
        match self {
            Self::Tiered(service) => service.put(category, key, value).await,
            Self::Local(service) => service.put(category, key, value).await,
        }
    }

    pub async fn evict(&self, category: &str, key: &str) {
        match self {
            Self::Tiered(service) => service.evict(category, key).await,
            Self::Local(service) => service.evict(category, key).await,
        }
    }

    /// Bulk evict. Empty input is a complete no-op.
    pub async fn evict_all<K: AsRef<str>>(&self, category: &str, keys: &[K]) {
        match self {
            Self::Tiered(service) => service.evict_all(category, keys).await,
            Self::Local(service) => service.evict_all(category, keys).await,
        }
    }

    /// Drop every entry of a category.
    pub async fn clear(&self, category: &str) {
        match self {
            Self::Tiered(service) => service.clear(category).await,
            Self::Local(service) => service.clear(category).await,
        }
    }
}

/// Facade over the full two-tier hierarchy.
pub struct TieredCacheService {
    manager: Arc<CacheManager>,
}

impl TieredCacheService {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    pub async fn get<T, F, Fut>(
        &self,
        category: &str,
        key: &str,
        loader: F,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, BoxError>>,
    {
        let cache = self.manager.cache(category);

        if let Some(bytes) = cache.get(key).await {
            match rmp_serde::from_slice::<T>(&bytes) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    // Corrupt for every instance; evict it everywhere and
                    // fall through to the loader.
                    warn!(cache = %category, key = %key, error = %e, "failed to decode cached value");
                    cache.evict(key).await;
                }
            }
        }

        let loaded = loader().await.map_err(|source| CacheError::Retrieval {
            key: cache.full_key(key),
            source,
        })?;

        if let Some(value) = &loaded {
            match rmp_serde::to_vec(value) {
                Ok(bytes) => cache.populate(key, bytes).await,
                Err(e) => {
                    warn!(cache = %category, key = %key, error = %e, "failed to encode value for cache");
                }
            }
        }
        Ok(loaded)
    }

    pub async fn put<T: Serialize>(&self, category: &str, key: &str, value: Option<&T>) {
        let cache = self.manager.cache(category);
        let Some(value) = value else {
            cache.put(key, None).await;
            return;
        };
        match rmp_serde::to_vec(value) {
            Ok(bytes) => cache.put(key, Some(bytes)).await,
            Err(e) => {
                warn!(cache = %category, key = %key, error = %e, "failed to encode value for cache");
            }
        }
    }

    pub async fn evict(&self, category: &str, key: &str) {
        self.manager.cache(category).evict(key).await;
    }

    pub async fn evict_all<K: AsRef<str>>(&self, category: &str, keys: &[K]) {
        self.manager.cache(category).evict_all(keys).await;
    }

    pub async fn clear(&self, category: &str) {
        self.manager.cache(category).clear().await;
    }
}

/// L1-only facade with the identical contract.
///
/// No shared store, no channel, no manager: one bounded local map, keys
/// namespaced exactly like the tiered variant so the two are swappable.
pub struct LocalCacheService {
    l1: Arc<LocalStore>,
    key_prefix: String,
}

impl LocalCacheService {
    pub fn new(l1: Arc<LocalStore>, key_prefix: String) -> Self {
        Self { l1, key_prefix }
    }

    fn full_key(&self, category: &str, key: &str) -> String {
        format!("{}{}::{}", self.key_prefix, category, key)
    }

    pub async fn get<T, F, Fut>(
        &self,
        category: &str,
        key: &str,
        loader: F,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, BoxError>>,
    {
        let full_key = self.full_key(category, key);

        if let Some(bytes) = self.l1.get(&full_key) {
            match rmp_serde::from_slice::<T>(&bytes) {
                Ok(value) => {
                    debug!(cache = %category, key = %key, "L1 hit");
                    return Ok(Some(value));
                }
                Err(e) => {
                    warn!(cache = %category, key = %key, error = %e, "failed to decode cached value");
                    self.l1.invalidate(&full_key);
                }
            }
        }

        let loaded = loader().await.map_err(|source| CacheError::Retrieval {
            key: full_key.clone(),
            source,
        })?;

        if let Some(value) = &loaded {
            match rmp_serde::to_vec(value) {
                Ok(bytes) => {
                    self.l1.insert(full_key, Arc::new(bytes));
                    debug!(cache = %category, key = %key, "cache loaded");
                }
                Err(e) => {
                    warn!(cache = %category, key = %key, error = %e, "failed to encode value for cache");
                }
            }
        }
        Ok(loaded)
    }

    pub async fn put<T: Serialize>(&self, category: &str, key: &str, value: Option<&T>) {
        let Some(value) = value else {
            self.evict(category, key).await;
            return;
        };
        let full_key = self.full_key(category, key);
        match rmp_serde::to_vec(value) {
            Ok(bytes) => {
                self.l1.insert(full_key, Arc::new(bytes));
                debug!(cache = %category, key = %key, "cache put");
            }
            Err(e) => {
                warn!(cache = %category, key = %key, error = %e, "failed to encode value for cache");
            }
        }
    }

    pub async fn evict(&self, category: &str, key: &str) {
        self.l1.invalidate(&self.full_key(category, key));
        debug!(cache = %category, key = %key, "cache evict");
    }

    pub async fn evict_all<K: AsRef<str>>(&self, category: &str, keys: &[K]) {
        if keys.is_empty() {
            return;
        }
        let full_keys: Vec<String> = keys
            .iter()
            .map(|k| self.full_key(category, k.as_ref()))
            .collect();
        self.l1.invalidate_all(&full_keys);
        debug!(cache = %category, key_count = keys.len(), "cache evict_all");
    }

    pub async fn clear(&self, category: &str) {
        let removed = self.l1.invalidate_by_prefix(&self.full_key(category, ""));
        debug!(cache = %category, key_count = removed, "cache clear");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::L1Settings;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    fn user() -> User {
        User {
            id: 1,
            name: "alice".into(),
        }
    }

    fn local_service() -> LocalCacheService {
        LocalCacheService::new(
            Arc::new(LocalStore::new(&L1Settings::default())),
            "test:".into(),
        )
    }

    #[tokio::test]
    async fn local_get_invokes_loader_once_and_caches() {
        let service = local_service();

        let value: Option<User> = service
            .get("users", "1", || async { Ok(Some(user())) })
            .await
            .unwrap();
        assert_eq!(value, Some(user()));

        // Second call must be served from L1: a loader that fails proves
        // it was never invoked.
        let value: Option<User> = service
            .get("users", "1", || async { Err("should not run".into()) })
            .await
            .unwrap();
        assert_eq!(value, Some(user()));
    }

    #[tokio::test]
    async fn local_absent_loader_result_is_not_cached() {
        let service = local_service();

        let value: Option<User> = service
            .get("users", "1", || async { Ok(None) })
            .await
            .unwrap();
        assert!(value.is_none());

        // The miss was not cached, so the loader runs again and succeeds.
        let value: Option<User> = service
            .get("users", "1", || async { Ok(Some(user())) })
            .await
            .unwrap();
        assert_eq!(value, Some(user()));
    }

    #[tokio::test]
    async fn local_loader_failure_is_surfaced_and_not_cached() {
        let service = local_service();

        let result: Result<Option<User>, _> = service
            .get("users", "1", || async { Err("db down".into()) })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, CacheError::Retrieval { .. }));
        assert!(err.to_string().contains("test:users::1"));

        let value: Option<User> = service
            .get("users", "1", || async { Ok(Some(user())) })
            .await
            .unwrap();
        assert_eq!(value, Some(user()));
    }

    #[tokio::test]
    async fn local_put_none_evicts() {
        let service = local_service();
        service.put("users", "1", Some(&user())).await;
        service.put::<User>("users", "1", None).await;

        let value: Option<User> = service
            .get("users", "1", || async { Ok(None) })
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn local_evict_all_and_clear() {
        let service = local_service();
        service.put("users", "1", Some(&user())).await;
        service.put("users", "2", Some(&user())).await;
        service.put("playlists", "1", Some(&user())).await;

        service.evict_all::<&str>("users", &[]).await;
        assert_eq!(service.l1.len(), 3);

        service.evict_all("users", &["1", "2"]).await;
        assert_eq!(service.l1.len(), 1);

        service.clear("playlists").await;
        assert!(service.l1.is_empty());
    }

    #[tokio::test]
    async fn tiered_service_without_store_uses_l1() {
        use crate::manager::CacheManager;
        use crate::registry::CategoryRegistry;
        use std::time::Duration;

        let manager = Arc::new(CacheManager::new(
            Arc::new(LocalStore::new(&L1Settings::default())),
            None,
            None,
            CategoryRegistry::default(),
            "test:".into(),
            Duration::from_secs(600),
        ));
        let service = TieredCacheService::new(manager);

        service.put("users", "1", Some(&user())).await;
        let value: Option<User> = service
            .get("users", "1", || async { Err("should not run".into()) })
            .await
            .unwrap();
        assert_eq!(value, Some(user()));

        service.evict("users", "1").await;
        let value: Option<User> = service
            .get("users", "1", || async { Ok(None) })
            .await
            .unwrap();
        assert!(value.is_none());
    }
}

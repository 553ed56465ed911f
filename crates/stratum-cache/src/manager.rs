//! Cache manager: one [`TieredCache`] per category name.
//!
//! Instances for configured categories are built eagerly at construction;
//! any other name gets a dynamic category with the default TTL on first use
//! and is registered for reuse. When no distributed tier is configured the
//! manager hands out permanently L1-only instances.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::local::LocalStore;
use crate::registry::CategoryRegistry;
use crate::store::{DistributedStore, InvalidationPublisher};
use crate::tiered::TieredCache;

pub struct CacheManager {
    l1: Arc<LocalStore>,
    store: Option<Arc<dyn DistributedStore>>,
    publisher: Option<Arc<dyn InvalidationPublisher>>,
    registry: CategoryRegistry,
    key_prefix: String,
    default_ttl: Duration,
    caches: DashMap<String, Arc<TieredCache>>,
}

impl CacheManager {
    pub fn new(
        l1: Arc<LocalStore>,
        store: Option<Arc<dyn DistributedStore>>,
        publisher: Option<Arc<dyn InvalidationPublisher>>,
        registry: CategoryRegistry,
        key_prefix: String,
        default_ttl: Duration,
    ) -> Self {
        let manager = Self {
            l1,
            store,
            publisher,
            registry,
            key_prefix,
            default_ttl,
            caches: DashMap::new(),
        };
        let names: Vec<String> = manager.registry.names().map(str::to_string).collect();
        for name in names {
            let cache = manager.build(&name);
            manager.caches.insert(name, cache);
        }
        manager
    }

    /// The tiered cache for `name`, creating and registering a dynamic one
    /// if the name was never configured.
    pub fn cache(&self, name: &str) -> Arc<TieredCache> {
        if let Some(cache) = self.caches.get(name) {
            return Arc::clone(&cache);
        }
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(cache = %name, "creating dynamic cache");
                self.build(name)
            })
            .clone()
    }

    /// All currently registered cache names (configured plus dynamic).
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.iter().map(|e| e.key().clone()).collect()
    }

    /// The process-wide L1 store backing every category. The invalidation
    /// subscriber evicts received keys from this store.
    pub fn local_store(&self) -> &Arc<LocalStore> {
        &self.l1
    }

    fn build(&self, name: &str) -> Arc<TieredCache> {
        let (ttl, l2_enabled) = match self.registry.get(name) {
            Some(category) => (category.ttl, category.l2_enabled),
            None => (self.default_ttl, true),
        };
        let (store, publisher) = if l2_enabled {
            (self.store.clone(), self.publisher.clone())
        } else {
            (None, None)
        };
        Arc::new(TieredCache::new(
            name.to_string(),
            self.key_prefix.clone(),
            ttl,
            Arc::clone(&self.l1),
            store,
            publisher,
        ))
    }
}

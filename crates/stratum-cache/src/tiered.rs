//! The per-category two-tier cache.
//!
//! Reads check L1, then the shared store, promoting shared hits into L1.
//! Writes go to the shared store first, then L1, then publish the full key
//! on the invalidation channel so every other instance drops its L1 copy.
//!
//! The publish also reaches this process's own subscriber: a `put` is
//! followed by the eviction of the entry it just wrote from L1, and the next
//! local read goes back to the shared store. That loop-back is the original
//! protocol and is kept as-is rather than filtered.
//!
//! Every shared-store or channel failure is caught here: it is logged,
//! counted, and the operation completes with its L1-only effect. The cache
//! stays available on stale or local-only data while the store is down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::local::LocalStore;
use crate::metrics;
use crate::store::{DistributedStore, InvalidationPublisher};

/// One logical cache (category) composed over the shared L1 store, an
/// optional distributed store and an optional invalidation publisher.
///
/// Both options are `None` in local-only deployments and for categories
/// with the shared tier disabled; every operation then degenerates to its
/// L1 effect without ever attempting a network call.
pub struct TieredCache {
    name: String,
    key_prefix: String,
    ttl: Duration,
    l1: Arc<LocalStore>,
    store: Option<Arc<dyn DistributedStore>>,
    publisher: Option<Arc<dyn InvalidationPublisher>>,
}

impl TieredCache {
    pub fn new(
        name: String,
        key_prefix: String,
        ttl: Duration,
        l1: Arc<LocalStore>,
        store: Option<Arc<dyn DistributedStore>>,
        publisher: Option<Arc<dyn InvalidationPublisher>>,
    ) -> Self {
        Self {
            name,
            key_prefix,
            ttl,
            l1,
            store,
            publisher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// TTL applied to shared-store writes for this category.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Derive the flat namespaced key: `<prefix><category>::<raw key>`.
    ///
    /// Deterministic and collision-free across categories as long as the
    /// raw key does not itself contain `"::"` — a documented assumption,
    /// not enforced.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}::{}", self.key_prefix, self.name, key)
    }

    /// Look up a key: L1, then the shared store (promoting a hit into L1).
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let full_key = self.full_key(key);

        if let Some(value) = self.l1.get(&full_key) {
            debug!(cache = %self.name, key = %key, "L1 hit");
            metrics::record_l1_hit(&self.name);
            return Some(value);
        }

        if let Some(value) = self.store_get(&full_key).await {
            debug!(cache = %self.name, key = %key, "L2 hit");
            metrics::record_l2_hit(&self.name);
            let value = Arc::new(value);
            self.l1.insert(full_key, Arc::clone(&value));
            return Some(value);
        }

        debug!(cache = %self.name, key = %key, "cache miss");
        metrics::record_miss(&self.name);
        None
    }

    /// Write a loader-produced value into both tiers without publishing an
    /// invalidation. Used on the read path after a total miss; absent loader
    /// results are never cached (no negative caching).
    pub async fn populate(&self, key: &str, value: Vec<u8>) {
        let full_key = self.full_key(key);
        let value = Arc::new(value);
        self.store_set(&full_key, &value).await;
        self.l1.insert(full_key, value);
        debug!(cache = %self.name, key = %key, ttl = ?self.ttl, "cache loaded");
    }

    /// Write a value to both tiers, then broadcast an invalidation for the
    /// key so other instances drop their L1 copies. `None` evicts instead.
    pub async fn put(&self, key: &str, value: Option<Vec<u8>>) {
        let Some(value) = value else {
            self.evict(key).await;
            return;
        };

        let full_key = self.full_key(key);
        let value = Arc::new(value);
        self.store_set(&full_key, &value).await;
        self.l1.insert(full_key.clone(), value);
        self.publish_invalidation(&full_key).await;
        metrics::record_put(&self.name);

        debug!(cache = %self.name, key = %key, ttl = ?self.ttl, "cache put");
    }

    /// Remove a key from both tiers and broadcast its invalidation.
    pub async fn evict(&self, key: &str) {
        let full_key = self.full_key(key);
        self.store_delete(&full_key).await;
        self.l1.invalidate(&full_key);
        self.publish_invalidation(&full_key).await;
        metrics::record_evictions(&self.name, 1);

        debug!(cache = %self.name, key = %key, "cache evict");
    }

    /// Bulk [`evict`](Self::evict). Empty input performs zero store or
    /// channel operations. Invalidations are published one per key, never
    /// batched.
    pub async fn evict_all<K: AsRef<str>>(&self, keys: &[K]) {
        if keys.is_empty() {
            return;
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k.as_ref())).collect();
        self.store_delete_many(&full_keys).await;
        self.l1.invalidate_all(&full_keys);
        for full_key in &full_keys {
            self.publish_invalidation(full_key).await;
        }
        metrics::record_evictions(&self.name, full_keys.len() as u64);

        debug!(cache = %self.name, key_count = keys.len(), "cache evict_all");
    }

    /// Drop every entry of this category: shared-store keys matching
    /// `<prefix><category>::*` are deleted and each one is broadcast;
    /// the local tier is swept by prefix regardless of what the shared
    /// store returned.
    pub async fn clear(&self) {
        let prefix = self.full_key("");
        let matched = self.store_scan(&format!("{prefix}*")).await;

        if !matched.is_empty() {
            self.store_delete_many(&matched).await;
        }
        self.l1.invalidate_by_prefix(&prefix);
        for full_key in &matched {
            self.publish_invalidation(full_key).await;
        }

        debug!(cache = %self.name, key_count = matched.len(), "cache clear");
    }

    async fn store_get(&self, full_key: &str) -> Option<Vec<u8>> {
        let store = self.store.as_ref()?;
        let start = Instant::now();
        let result = store.get(full_key).await;
        metrics::record_store_duration(&self.name, "get", start.elapsed());
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(cache = %self.name, key = %full_key, error = %e, "store get failed");
                metrics::record_store_error(&self.name, "get");
                None
            }
        }
    }

    async fn store_set(&self, full_key: &str, value: &Arc<Vec<u8>>) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let start = Instant::now();
        let result = store.set(full_key, value, self.ttl).await;
        metrics::record_store_duration(&self.name, "set", start.elapsed());
        if let Err(e) = result {
            warn!(cache = %self.name, key = %full_key, error = %e, "store set failed");
            metrics::record_store_error(&self.name, "set");
        }
    }

    async fn store_delete(&self, full_key: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let start = Instant::now();
        let result = store.delete(full_key).await;
        metrics::record_store_duration(&self.name, "delete", start.elapsed());
        if let Err(e) = result {
            warn!(cache = %self.name, key = %full_key, error = %e, "store delete failed");
            metrics::record_store_error(&self.name, "delete");
        }
    }

    async fn store_delete_many(&self, full_keys: &[String]) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let start = Instant::now();
        let result = store.delete_many(full_keys).await;
        metrics::record_store_duration(&self.name, "delete", start.elapsed());
        if let Err(e) = result {
            warn!(
                cache = %self.name,
                key_count = full_keys.len(),
                error = %e,
                "store bulk delete failed"
            );
            metrics::record_store_error(&self.name, "delete");
        }
    }

    async fn store_scan(&self, pattern: &str) -> Vec<String> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };
        let start = Instant::now();
        let result = store.scan(pattern).await;
        metrics::record_store_duration(&self.name, "scan", start.elapsed());
        match result {
            Ok(keys) => keys,
            Err(e) => {
                warn!(cache = %self.name, pattern = %pattern, error = %e, "store scan failed");
                metrics::record_store_error(&self.name, "scan");
                Vec::new()
            }
        }
    }

    async fn publish_invalidation(&self, full_key: &str) {
        let Some(publisher) = self.publisher.as_ref() else {
            return;
        };
        if let Err(e) = publisher.publish(full_key).await {
            warn!(cache = %self.name, key = %full_key, error = %e, "failed to publish invalidation");
            metrics::record_store_error(&self.name, "publish");
        }
    }
}

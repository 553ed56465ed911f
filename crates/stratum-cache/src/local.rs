//! Local (L1) cache tier.
//!
//! A bounded, write-TTL-expiring concurrent map shared by every category in
//! the process (keys carry the category prefix). Values are opaque bytes
//! wrapped in `Arc` so hits clone a pointer, not the payload.
//!
//! Expiry is lazy: an expired entry is dropped by the read that finds it.
//! Capacity pressure first sweeps expired entries, then evicts the entry
//! closest to expiry.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::L1Settings;

struct CachedEntry {
    data: Arc<Vec<u8>>,
    expires_at: Instant,
}

/// Thread-safe in-process store. All operations are safe under concurrent
/// access from caller tasks and the invalidation subscriber.
pub struct LocalStore {
    entries: DashMap<String, CachedEntry>,
    max_entries: usize,
    ttl: Duration,
    enabled: bool,
}

impl LocalStore {
    pub fn new(settings: &L1Settings) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: settings.max_entries,
            ttl: Duration::from_secs(settings.ttl_secs),
            enabled: settings.enabled,
        }
    }

    /// Get a live entry. Removes and misses on an expired one.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        if !self.enabled {
            return None;
        }
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(Arc::clone(&entry.data));
            }
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    /// Insert with the store's write TTL, evicting under capacity pressure.
    /// A disabled store retains nothing.
    pub fn insert(&self, key: String, data: Arc<Vec<u8>>) {
        if !self.enabled {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_for_capacity();
        }
        self.entries.insert(
            key,
            CachedEntry {
                data,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Remove a single key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.entries.remove(key.as_ref());
        }
    }

    /// Remove every key starting with `prefix`. Returns how many were
    /// removed. The count is taken inside the sweep itself, not from a
    /// before/after length diff, which would be wrong under concurrent
    /// inserts.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Snapshot of the current key set.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries eagerly. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.expires_at > now {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }

    fn evict_for_capacity(&self) {
        if self.cleanup_expired() > 0 {
            return;
        }
        // Still full: evict the entry closest to expiry.
        let victim = self
            .entries
            .iter()
            .min_by_key(|e| e.expires_at)
            .map(|e| e.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

//! Static category registry.
//!
//! Built once from configuration at startup; categories are data, not code,
//! so new ones can be added without recompiling. The registry itself is
//! read-only — unknown names are handled by the manager, which creates a
//! dynamic category with the default TTL on first use.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::CacheSettings;

/// A named partition of the cache keyspace.
#[derive(Debug, Clone)]
pub struct CacheCategory {
    pub name: String,
    /// TTL applied to entries of this category in the shared tier.
    pub ttl: Duration,
    /// Whether this category uses the shared tier and the invalidation
    /// channel at all.
    pub l2_enabled: bool,
}

/// Immutable name → category lookup table.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    categories: HashMap<String, CacheCategory>,
}

impl CategoryRegistry {
    /// Build the registry from validated settings. Categories without their
    /// own TTL inherit `l2.default_ttl_secs`.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let default_ttl = settings.default_ttl();
        let categories = settings
            .categories
            .iter()
            .map(|c| {
                let category = CacheCategory {
                    name: c.name.clone(),
                    ttl: c
                        .ttl_secs
                        .map(Duration::from_secs)
                        .unwrap_or(default_ttl),
                    l2_enabled: c.l2_enabled,
                };
                (c.name.clone(), category)
            })
            .collect();
        Self { categories }
    }

    pub fn get(&self, name: &str) -> Option<&CacheCategory> {
        self.categories.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

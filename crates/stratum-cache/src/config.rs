//! Cache configuration.
//!
//! Settings deserialize from a TOML file and/or `STRATUM_`-prefixed
//! environment variables (e.g. `STRATUM_DISTRIBUTED__ENABLED=true`), with
//! every field defaulted so an empty config is valid. `validate()` rejects
//! inconsistent settings at startup rather than at request time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CacheError;

/// Top-level cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Prefix prepended to every cache key (namespace in the shared store).
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Local (L1) tier settings.
    #[serde(default)]
    pub l1: L1Settings,

    /// Shared (L2) tier settings.
    #[serde(default)]
    pub l2: L2Settings,

    /// Pub/sub channel carrying cross-instance invalidation messages.
    #[serde(default = "default_invalidation_channel")]
    pub invalidation_channel: String,

    /// Distributed tier (Redis) connection settings.
    #[serde(default)]
    pub distributed: DistributedSettings,

    /// Known cache categories. Unknown names still work: they get a dynamic
    /// category with the default L2 TTL on first use.
    #[serde(default)]
    pub categories: Vec<CategorySettings>,
}

/// Local in-process cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L1Settings {
    /// Disabling L1 turns it into a pass-through that retains nothing.
    #[serde(default = "default_l1_enabled")]
    pub enabled: bool,

    /// Maximum number of entries held in the L1 map.
    #[serde(default = "default_l1_max_entries")]
    pub max_entries: usize,

    /// Write-time TTL for L1 entries, in seconds. Process-local policy,
    /// never communicated to other instances.
    #[serde(default = "default_l1_ttl_secs")]
    pub ttl_secs: u64,
}

/// Shared cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L2Settings {
    /// TTL applied to categories without their own `ttl_secs`, in seconds.
    #[serde(default = "default_l2_ttl_secs")]
    pub default_ttl_secs: u64,
}

/// Redis connection settings for the distributed tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedSettings {
    /// When false the service runs local-only: no Redis objects are built
    /// and no store or channel operation is ever attempted.
    #[serde(default = "default_distributed_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g. "redis://localhost:6379").
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// A named partition of the keyspace with its own TTL policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySettings {
    pub name: String,

    /// L2 TTL override in seconds; falls back to `l2.default_ttl_secs`.
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// When false this category never touches the shared tier or the
    /// invalidation channel, even with Redis configured.
    #[serde(default = "default_l2_enabled")]
    pub l2_enabled: bool,
}

fn default_key_prefix() -> String {
    "stratum:".to_string()
}

fn default_invalidation_channel() -> String {
    "stratum:cache:invalidate".to_string()
}

fn default_l1_enabled() -> bool {
    true
}

fn default_l1_max_entries() -> usize {
    10_000
}

fn default_l1_ttl_secs() -> u64 {
    30
}

fn default_l2_ttl_secs() -> u64 {
    600
}

fn default_l2_enabled() -> bool {
    true
}

fn default_distributed_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            l1: L1Settings::default(),
            l2: L2Settings::default(),
            invalidation_channel: default_invalidation_channel(),
            distributed: DistributedSettings::default(),
            categories: Vec::new(),
        }
    }
}

impl Default for L1Settings {
    fn default() -> Self {
        Self {
            enabled: default_l1_enabled(),
            max_entries: default_l1_max_entries(),
            ttl_secs: default_l1_ttl_secs(),
        }
    }
}

impl Default for L2Settings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_l2_ttl_secs(),
        }
    }
}

impl Default for DistributedSettings {
    fn default() -> Self {
        Self {
            enabled: default_distributed_enabled(),
            url: default_redis_url(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CacheSettings {
    /// Load settings from an optional TOML file plus environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, CacheError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("STRATUM")
                .separator("__")
                .try_parsing(true),
        );

        let settings: CacheSettings = builder
            .build()
            .map_err(|e| CacheError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject inconsistent settings. Called by the factory before anything
    /// else is constructed.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.key_prefix.is_empty() {
            return Err(CacheError::Config("key_prefix must not be empty".into()));
        }
        if self.invalidation_channel.is_empty() {
            return Err(CacheError::Config(
                "invalidation_channel must not be empty".into(),
            ));
        }
        if self.l1.max_entries == 0 {
            return Err(CacheError::Config("l1.max_entries must be > 0".into()));
        }
        if self.l1.ttl_secs == 0 {
            return Err(CacheError::Config("l1.ttl_secs must be > 0".into()));
        }
        if self.l2.default_ttl_secs == 0 {
            return Err(CacheError::Config("l2.default_ttl_secs must be > 0".into()));
        }
        if self.distributed.enabled {
            if self.distributed.url.is_empty() {
                return Err(CacheError::Config("distributed.url must not be empty".into()));
            }
            if self.distributed.pool_size == 0 {
                return Err(CacheError::Config("distributed.pool_size must be > 0".into()));
            }
            if self.distributed.timeout_ms == 0 {
                return Err(CacheError::Config("distributed.timeout_ms must be > 0".into()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if category.name.is_empty() {
                return Err(CacheError::Config("category name must not be empty".into()));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(CacheError::Config(format!(
                    "duplicate cache category '{}'",
                    category.name
                )));
            }
            if category.ttl_secs == Some(0) {
                return Err(CacheError::Config(format!(
                    "category '{}' ttl_secs must be > 0",
                    category.name
                )));
            }
        }

        Ok(())
    }

    /// L1 write TTL as a `Duration`.
    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1.ttl_secs)
    }

    /// Default L2 TTL applied to categories without an override.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.l2.default_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = CacheSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.key_prefix, "stratum:");
        assert_eq!(settings.l1.max_entries, 10_000);
        assert!(!settings.distributed.enabled);
    }

    #[test]
    fn default_ttl_fallback() {
        let settings = CacheSettings {
            l2: L2Settings {
                default_ttl_secs: 120,
            },
            ..Default::default()
        };
        assert_eq!(settings.default_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn rejects_empty_key_prefix() {
        let settings = CacheSettings {
            key_prefix: String::new(),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn rejects_zero_l1_capacity() {
        let mut settings = CacheSettings::default();
        settings.l1.max_entries = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_categories() {
        let mut settings = CacheSettings::default();
        settings.categories = vec![
            CategorySettings {
                name: "users".into(),
                ttl_secs: Some(300),
                l2_enabled: true,
            },
            CategorySettings {
                name: "users".into(),
                ttl_secs: None,
                l2_enabled: true,
            },
        ];
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_zero_category_ttl() {
        let mut settings = CacheSettings::default();
        settings.categories = vec![CategorySettings {
            name: "users".into(),
            ttl_secs: Some(0),
            l2_enabled: true,
        }];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn distributed_url_checked_only_when_enabled() {
        let mut settings = CacheSettings::default();
        settings.distributed.url = String::new();
        assert!(settings.validate().is_ok());

        settings.distributed.enabled = true;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn deserializes_from_toml() {
        let toml = r#"
            key_prefix = "app:"

            [l1]
            max_entries = 500
            ttl_secs = 10

            [distributed]
            enabled = true
            url = "redis://cache:6379"

            [[categories]]
            name = "users"
            ttl_secs = 300

            [[categories]]
            name = "sessions"
            l2_enabled = false
        "#;
        let settings: CacheSettings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.key_prefix, "app:");
        assert_eq!(settings.l1.max_entries, 500);
        assert!(settings.distributed.enabled);
        assert_eq!(settings.categories.len(), 2);
        assert_eq!(settings.categories[0].ttl_secs, Some(300));
        assert!(settings.categories[0].l2_enabled);
        assert!(!settings.categories[1].l2_enabled);
        assert!(settings.validate().is_ok());
    }
}

//! # Process Configuration
//!
//! Layered configuration for a geecache node: environment variables
//! override an optional TOML file, which overrides built-in defaults.
//! Grounded on the same `figment` layering pattern used for configuration
//! elsewhere in the wider cache/storage ecosystem this crate draws from.
//!
//! Priority (highest to lowest): `GEECACHE_*` environment variables, the
//! `geecache.toml` file (if present), then [`GeecacheConfig::default`].

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Configuration error.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The layered sources could not be merged or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Process-level configuration for a single geecache node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeecacheConfig {
    /// Address this node listens on for peer and client traffic.
    pub listen_addr: String,
    /// Addresses of all peers in the cluster, including this node's own.
    pub peers: Vec<String>,
    /// Default per-group capacity (entry count; 0 = unbounded).
    pub default_capacity: usize,
    /// Default TTL applied to populated entries, in seconds.
    pub default_ttl_secs: u64,
    /// Background sweeper interval, in seconds.
    pub sweep_interval_secs: u64,
    /// Virtual nodes per peer on the consistent-hash ring.
    pub replicas: usize,
    /// Base path prefix for the HTTP wire binding.
    pub base_path: String,
    /// Log level passed to `tracing-subscriber`'s env filter.
    pub log_level: String,
}

impl Default for GeecacheConfig {
    fn default() -> Self {
        GeecacheConfig {
            listen_addr: "127.0.0.1:9090".to_string(),
            peers: Vec::new(),
            default_capacity: 10_000,
            default_ttl_secs: 7 * 24 * 60 * 60,
            sweep_interval_secs: 10 * 60,
            replicas: 50,
            base_path: "/_geecache/".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GeecacheConfig {
    /// Loads configuration from `geecache.toml` (if present) and the
    /// `GEECACHE_*` environment, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("geecache.toml")
    }

    /// Loads configuration from a specific TOML file path.
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("GEECACHE_"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Returns the configured default TTL as a [`Duration`].
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Returns the configured sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = GeecacheConfig::default();
        assert_eq!(cfg.default_ttl_secs, 604_800);
        assert_eq!(cfg.replicas, 50);
        assert_eq!(cfg.base_path, "/_geecache/");
    }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("GEECACHE_LISTEN_ADDR", "0.0.0.0:7777");
        let cfg = GeecacheConfig::load_from_path("does-not-exist.toml").expect("load");
        assert_eq!(cfg.listen_addr, "0.0.0.0:7777");
        std::env::remove_var("GEECACHE_LISTEN_ADDR");
    }
}

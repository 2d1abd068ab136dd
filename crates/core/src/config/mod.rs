//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PAGECACHE_*)
//! 2. TOML config file (if PAGECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, DEFAULT_TTL_HOURS};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PAGECACHE_*)
/// 2. TOML config file (if PAGECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding cache records and the index.
    ///
    /// Set via PAGECACHE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// TTL for writes that do not specify one, in hours.
    ///
    /// Set via PAGECACHE_DEFAULT_TTL_HOURS environment variable.
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u32,

    /// Whether to sweep expired entries when the cache is opened.
    ///
    /// Set via PAGECACHE_SWEEP_ON_OPEN environment variable.
    #[serde(default = "default_true")]
    pub sweep_on_open: bool,

    /// Interval between background sweeps, in seconds. Unset disables the sweeper.
    ///
    /// Set via PAGECACHE_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_ttl_hours() -> u32 {
    DEFAULT_TTL_HOURS
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            default_ttl_hours: default_ttl_hours(),
            sweep_on_open: true,
            sweep_interval_secs: None,
        }
    }
}

impl AppConfig {
    /// Background sweep interval, if the sweeper is enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    /// The cache construction parameters described by this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            dir: self.cache_dir.clone(),
            default_ttl_hours: self.default_ttl_hours,
            sweep_on_open: self.sweep_on_open,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PAGECACHE_`
    /// 2. TOML file from `PAGECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PAGECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PAGECACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

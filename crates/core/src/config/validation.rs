//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest default TTL accepted, one week.
const MAX_DEFAULT_TTL_HOURS: u32 = 168;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_dir` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `default_ttl_hours` is 0 or exceeds one week
    /// - `sweep_interval_secs` is set to 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_dir".into(),
                hint: "Set PAGECACHE_CACHE_DIR environment variable".into(),
            });
        }

        if self.default_ttl_hours == 0 {
            return Err(ConfigError::Invalid {
                field: "default_ttl_hours".into(),
                reason: "must be at least 1 hour".into(),
            });
        }
        if self.default_ttl_hours > MAX_DEFAULT_TTL_HOURS {
            return Err(ConfigError::Invalid {
                field: "default_ttl_hours".into(),
                reason: format!("must not exceed {MAX_DEFAULT_TTL_HOURS} hours"),
            });
        }

        if self.sweep_interval_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_secs".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        if !self.sweep_on_open && self.sweep_interval_secs.is_none() {
            tracing::warn!(
                "sweep_on_open is disabled and no sweep_interval_secs is set; \
                 expired entries are only removed by explicit sweeps"
            );
        }

        Ok(())
    }
}

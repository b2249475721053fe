//! Cache configuration types and defaults
//!
//! This module contains the configuration structures for the metadata cache,
//! including default values and validation logic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::cache;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the application/field metadata cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached application stays authoritative
    #[serde(with = "humantime_serde")]
    pub application_cache_ttl: Duration,
    /// How long a translation mapping stays authoritative
    #[serde(with = "humantime_serde")]
    pub field_cache_ttl: Duration,
    /// Maximum number of cached applications
    pub max_application_cache_entries: usize,
    /// Fraction of the TTL after which reads trigger a background refresh
    pub auto_refresh_threshold: f64,
    /// Sample records pulled for levels without field definitions
    pub sample_record_limit: usize,
    /// Lifetime of an entry stored without any field metadata
    #[serde(with = "humantime_serde")]
    pub degraded_entry_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            application_cache_ttl: cache::APPLICATION_CACHE_TTL,
            field_cache_ttl: cache::FIELD_CACHE_TTL,
            max_application_cache_entries: cache::MAX_APPLICATION_ENTRIES,
            auto_refresh_threshold: cache::AUTO_REFRESH_THRESHOLD,
            sample_record_limit: cache::SAMPLE_RECORD_LIMIT,
            degraded_entry_ttl: cache::DEGRADED_ENTRY_TTL,
        }
    }
}

impl CacheConfig {
    /// Set the application TTL
    pub fn with_application_ttl(mut self, ttl: Duration) -> Self {
        self.application_cache_ttl = ttl;
        self
    }

    /// Set the translation mapping TTL
    pub fn with_field_ttl(mut self, ttl: Duration) -> Self {
        self.field_cache_ttl = ttl;
        self
    }

    /// Set the maximum number of cached applications
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_application_cache_entries = max_entries;
        self
    }

    /// Set the auto-refresh threshold
    pub fn with_auto_refresh_threshold(mut self, threshold: f64) -> Self {
        self.auto_refresh_threshold = threshold;
        self
    }

    /// Set the sample size used for field inference
    pub fn with_sample_record_limit(mut self, limit: usize) -> Self {
        self.sample_record_limit = limit;
        self
    }

    /// Set the lifetime of entries stored without field metadata
    pub fn with_degraded_entry_ttl(mut self, ttl: Duration) -> Self {
        self.degraded_entry_ttl = ttl;
        self
    }

    /// Remaining lifetime below which an entry counts as stale-approaching
    pub fn refresh_window(&self) -> Duration {
        self.refresh_window_for(self.application_cache_ttl)
    }

    /// Refresh window of an entry with the given total lifetime
    pub fn refresh_window_for(&self, lifetime: Duration) -> Duration {
        let fraction = (1.0 - self.auto_refresh_threshold).clamp(0.0, 1.0);
        let millis = lifetime.as_millis() as f64 * fraction;
        Duration::from_millis(millis.round() as u64)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a threshold outside (0, 1), a
    /// zero entry cap, a zero TTL, or a zero sample limit
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.auto_refresh_threshold > 0.0 && self.auto_refresh_threshold < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "cache.auto_refresh_threshold".to_string(),
                value: self.auto_refresh_threshold.to_string(),
                reason: "Must be strictly between 0 and 1".to_string(),
            });
        }

        if self.max_application_cache_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_application_cache_entries".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        for (field, ttl) in [
            ("cache.application_cache_ttl", self.application_cache_ttl),
            ("cache.field_cache_ttl", self.field_cache_ttl),
            ("cache.degraded_entry_ttl", self.degraded_entry_ttl),
        ] {
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0s".to_string(),
                    reason: "TTL must be positive".to_string(),
                });
            }
        }

        if self.sample_record_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.sample_record_limit".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

//! Cached application metadata and its freshness states

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::clock::chrono_duration;
use crate::app::models::{ApplicationInfo, FieldDefinition, LevelMapping};

use super::config::CacheConfig;

/// Freshness of one application's cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheState {
    /// Nothing cached
    Absent,
    /// Authoritative and not yet near expiry
    Fresh,
    /// Authoritative but inside the auto-refresh window
    StaleApproaching,
    /// Past its expiry
    Expired,
}

/// Metadata of one application
#[derive(Debug, Clone, Serialize)]
pub struct CachedApplication {
    /// Application record from the application list
    pub application: ApplicationInfo,
    pub levels: Vec<LevelMapping>,
    /// Field definitions flattened across levels
    pub fields: Vec<FieldDefinition>,
    /// Lowercase alias to field
    #[serde(skip)]
    pub fields_by_alias: HashMap<String, FieldDefinition>,
    /// Lowercase display name to field
    #[serde(skip)]
    pub fields_by_name: HashMap<String, FieldDefinition>,
    /// ContentAPI path for records, when one is known
    pub endpoint: Option<String>,
    pub last_updated: DateTime<Utc>,
    /// `last_updated + application_cache_ttl`, or the shorter degraded
    /// lifetime for entries without fields
    pub cache_expires_at: DateTime<Utc>,
    /// Distinguishes successive refreshes of the same application
    #[serde(skip)]
    pub generation: u64,
}

impl CachedApplication {
    pub fn new(
        application: ApplicationInfo,
        levels: Vec<LevelMapping>,
        fields: Vec<FieldDefinition>,
        endpoint: Option<String>,
        now: DateTime<Utc>,
        config: &CacheConfig,
        generation: u64,
    ) -> Self {
        let fields_by_alias = fields
            .iter()
            .map(|field| (field.alias.to_lowercase(), field.clone()))
            .collect();
        let fields_by_name = fields
            .iter()
            .map(|field| (field.name.to_lowercase(), field.clone()))
            .collect();

        Self {
            application,
            levels,
            fields,
            fields_by_alias,
            fields_by_name,
            endpoint,
            last_updated: now,
            cache_expires_at: now + chrono_duration(config.application_cache_ttl),
            generation,
        }
    }

    /// Shorten or extend the entry's lifetime, counted from `last_updated`
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.cache_expires_at = self.last_updated + chrono_duration(lifetime);
        self
    }

    pub fn application_id(&self) -> i64 {
        self.application.id
    }

    /// Total lifetime of the entry
    pub fn lifetime(&self) -> Duration {
        (self.cache_expires_at - self.last_updated)
            .to_std()
            .unwrap_or_default()
    }

    /// Freshness at `now`
    ///
    /// The auto-refresh window is a fraction of the entry's own lifetime.
    pub fn state(&self, now: DateTime<Utc>, config: &CacheConfig) -> CacheState {
        if now >= self.cache_expires_at {
            return CacheState::Expired;
        }

        let remaining = self.cache_expires_at - now;
        if remaining < chrono_duration(config.refresh_window_for(self.lifetime())) {
            CacheState::StaleApproaching
        } else {
            CacheState::Fresh
        }
    }

    /// Active field matching a record key by alias or display name
    pub fn active_field(&self, key: &str) -> Option<&FieldDefinition> {
        let key = key.to_lowercase();
        self.fields_by_alias
            .get(&key)
            .or_else(|| self.fields_by_name.get(&key))
            .filter(|field| field.is_active)
    }

    /// Whether the entry was stored without any level metadata
    pub fn is_degraded(&self) -> bool {
        self.levels.is_empty()
    }

    /// Whether any field of the entry is active
    pub fn has_active_fields(&self) -> bool {
        self.fields.iter().any(|field| field.is_active)
    }
}

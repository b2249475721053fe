//! Field alias and display-name translation
//!
//! ContentAPI records are keyed by field alias (`Risk_Title`) while users
//! think in display names (`Risk Title`). [`TranslationLayer`] keeps one
//! [`TranslationMapping`] per cached application and uses the cached field
//! definitions to drop inactive or unknown keys before renaming.
//!
//! Every operation fails open: an application with no cache entry or no
//! mapping gets its records back unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::app::cache::ApplicationStore;
use crate::app::clock::{chrono_duration, SharedClock};
use crate::app::models::{FieldDefinition, Record};

pub mod format;

pub use format::format_field_value;

/// Alias and display-name lookup tables for one application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationMapping {
    pub application_id: i64,
    /// Alias, as written, to display name
    pub alias_to_display_name: HashMap<String, String>,
    /// Lowercase display name to alias
    pub display_name_to_alias: HashMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

impl TranslationMapping {
    /// Build a mapping from the active fields in `fields`
    pub fn from_fields(
        application_id: i64,
        fields: &[FieldDefinition],
        now: DateTime<Utc>,
    ) -> Self {
        let active = fields.iter().filter(|field| field.is_active);

        let mut alias_to_display_name = HashMap::new();
        let mut display_name_to_alias = HashMap::new();
        for field in active {
            alias_to_display_name.insert(field.alias.clone(), field.name.clone());
            display_name_to_alias.insert(field.name.to_lowercase(), field.alias.clone());
        }

        Self {
            application_id,
            alias_to_display_name,
            display_name_to_alias,
            last_updated: now,
        }
    }

    /// Display name for an alias, falling back to a case-insensitive match
    pub fn display_name_for(&self, alias: &str) -> Option<&String> {
        self.alias_to_display_name.get(alias).or_else(|| {
            self.alias_to_display_name
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(alias))
                .map(|(_, display_name)| display_name)
        })
    }

    pub fn len(&self) -> usize {
        self.alias_to_display_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alias_to_display_name.is_empty()
    }
}

/// Translates records between aliases and display names
#[derive(Debug, Clone)]
pub struct TranslationLayer {
    applications: ApplicationStore,
    mappings: Arc<RwLock<HashMap<i64, TranslationMapping>>>,
    clock: SharedClock,
}

impl TranslationLayer {
    /// Create a layer that reads field definitions from `applications`
    pub fn new(applications: ApplicationStore, clock: SharedClock) -> Self {
        Self {
            applications,
            mappings: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Build and store the mapping for an application, replacing any previous one
    pub async fn create_field_translation_mapping(
        &self,
        application_id: i64,
        fields: &[FieldDefinition],
    ) -> TranslationMapping {
        let mapping = TranslationMapping::from_fields(application_id, fields, self.clock.now());
        tracing::debug!(
            "Built translation mapping for application {} with {} field(s)",
            application_id,
            mapping.len()
        );

        self.mappings
            .write()
            .await
            .insert(application_id, mapping.clone());
        mapping
    }

    /// Clone of the stored mapping
    pub async fn mapping(&self, application_id: i64) -> Option<TranslationMapping> {
        self.mappings.read().await.get(&application_id).cloned()
    }

    /// Drop keys that do not name an active field of the application
    ///
    /// Keys match by alias or display name, case-insensitively. Without a
    /// cache entry, or when the entry knows no active field, the record is
    /// returned unchanged.
    pub async fn filter_record_to_active_fields(
        &self,
        application_id: i64,
        record: Record,
    ) -> Record {
        let applications = self.applications.read().await;
        let Some(entry) = applications.get(&application_id) else {
            return record;
        };
        if !entry.has_active_fields() {
            return record;
        }

        record
            .into_iter()
            .filter(|(key, _)| entry.active_field(key).is_some())
            .collect()
    }

    /// Rename alias keys to display names and format their values
    ///
    /// Unmapped keys pass through untouched.
    pub async fn translate_aliases_to_display_names(
        &self,
        application_id: i64,
        record: Record,
    ) -> Record {
        let mappings = self.mappings.read().await;
        let Some(mapping) = mappings.get(&application_id) else {
            return record;
        };

        record
            .into_iter()
            .map(|(key, value)| match mapping.display_name_for(&key) {
                Some(display_name) => {
                    let formatted = format_field_value(&value, &key);
                    (display_name.clone(), formatted)
                }
                None => (key, value),
            })
            .collect()
    }

    /// Rename display-name keys back to aliases, without touching values
    pub async fn translate_display_names_to_aliases(
        &self,
        application_id: i64,
        record: Record,
    ) -> Record {
        let mappings = self.mappings.read().await;
        let Some(mapping) = mappings.get(&application_id) else {
            return record;
        };

        record
            .into_iter()
            .map(|(key, value)| {
                match mapping.display_name_to_alias.get(&key.to_lowercase()) {
                    Some(alias) => (alias.clone(), value),
                    None => (key, value),
                }
            })
            .collect()
    }

    /// Filter each record to active fields, then translate it
    pub async fn translate_records(&self, application_id: i64, records: Vec<Record>) -> Vec<Record> {
        let mut translated = Vec::with_capacity(records.len());
        for record in records {
            let filtered = self
                .filter_record_to_active_fields(application_id, record)
                .await;
            translated.push(
                self.translate_aliases_to_display_names(application_id, filtered)
                    .await,
            );
        }
        translated
    }

    pub async fn contains(&self, application_id: i64) -> bool {
        self.mappings.read().await.contains_key(&application_id)
    }

    /// Forget one application's mapping
    pub async fn remove(&self, application_id: i64) -> bool {
        self.mappings.write().await.remove(&application_id).is_some()
    }

    /// Forget every mapping
    pub async fn clear(&self) {
        self.mappings.write().await.clear();
    }

    /// Remove mappings last built more than `ttl` before `now`
    pub async fn remove_older_than(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> usize {
        let ttl = chrono_duration(ttl);
        let mut mappings = self.mappings.write().await;
        let before = mappings.len();
        mappings.retain(|_, mapping| now - mapping.last_updated < ttl);
        before - mappings.len()
    }

    pub async fn len(&self) -> usize {
        self.mappings.read().await.len()
    }
}

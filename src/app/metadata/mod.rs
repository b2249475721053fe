//! Typed access to the Archer metadata endpoints
//!
//! [`MetadataApi`] wraps an authenticated [`ArcherClient`] and turns the
//! system API's envelopes into models:
//! - `levels`: level lookup by name or alias and ContentAPI endpoint resolution
//! - `extractor`: field definitions from the metadata API or sample records

use std::sync::Arc;

use serde_json::Value;

use crate::app::client::{ArcherClient, ArcherRequest};
use crate::app::envelope::ArcherEnvelope;
use crate::app::models::{ApplicationInfo, ApplicationKind, LevelMapping, Record};
use crate::constants::endpoints;
use crate::errors::{MetadataError, MetadataResult};

pub mod extractor;
pub mod levels;

pub use extractor::{infer_field_type, FieldExtractor};
pub use levels::LevelResolver;

/// Metadata endpoint wrappers bound to one authenticated client
#[derive(Debug, Clone)]
pub struct MetadataApi {
    client: Arc<ArcherClient>,
}

impl MetadataApi {
    pub fn new(client: Arc<ArcherClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ArcherClient> {
        &self.client
    }

    /// Fetch and flatten a metadata endpoint
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::UnexpectedStatus` for non-success statuses,
    /// `MetadataError::InvalidResponse` for unrecognized bodies, or a
    /// transport error
    pub async fn get_items(&self, request: ArcherRequest) -> MetadataResult<Vec<Value>> {
        let path = request.path.clone();
        let response = self.client.execute(request).await?;

        if response.status == 401 {
            self.client.invalidate_session().await;
        }
        if !response.is_success() {
            return Err(MetadataError::UnexpectedStatus {
                endpoint: path,
                status: response.status,
            });
        }

        Ok(ArcherEnvelope::decode(&path, response.body)?.into_items())
    }

    /// All applications followed by all questionnaires
    ///
    /// A failing questionnaire list is logged and skipped.
    pub async fn fetch_applications(&self) -> MetadataResult<Vec<ApplicationInfo>> {
        let mut applications: Vec<ApplicationInfo> = self
            .get_items(ArcherRequest::get(endpoints::APPLICATIONS))
            .await?
            .into_iter()
            .filter_map(|item| ApplicationInfo::from_value(item, ApplicationKind::Application))
            .collect();

        match self
            .get_items(ArcherRequest::get(endpoints::QUESTIONNAIRES))
            .await
        {
            Ok(items) => applications.extend(
                items
                    .into_iter()
                    .filter_map(|item| {
                        ApplicationInfo::from_value(item, ApplicationKind::Questionnaire)
                    }),
            ),
            Err(e) => tracing::warn!("Questionnaire list unavailable: {}", e),
        }

        tracing::debug!("Fetched {} applications and questionnaires", applications.len());
        Ok(applications)
    }

    /// Every non-deleted level on the instance
    pub async fn fetch_all_levels(&self) -> MetadataResult<Vec<LevelMapping>> {
        let items = self.get_items(ArcherRequest::get(endpoints::LEVELS)).await?;
        Ok(parse_levels(&items, None))
    }

    /// Levels belonging to one module
    pub async fn fetch_levels_for_module(
        &self,
        module_id: i64,
        module_name: &str,
    ) -> MetadataResult<Vec<LevelMapping>> {
        let path = format!("{}/{}", endpoints::LEVELS_BY_MODULE, module_id);
        let items = self.get_items(ArcherRequest::get(path)).await?;
        let mut levels = parse_levels(&items, Some(module_name));
        for level in &mut levels {
            if level.module_id == 0 {
                level.module_id = module_id;
            }
        }
        Ok(levels)
    }

    /// Raw field definition objects of one level
    pub async fn fetch_field_definitions(&self, level_id: i64) -> MetadataResult<Vec<Value>> {
        let path = format!("{}/{}", endpoints::FIELD_DEFINITIONS_BY_LEVEL, level_id);
        self.get_items(ArcherRequest::get(path)).await
    }

    /// Whether a ContentAPI path answers a one-record request with 200
    pub async fn probe(&self, path: &str) -> bool {
        let request = ArcherRequest::get(path).with_query("$top", 1);
        match self.client.execute(request).await {
            Ok(response) => {
                tracing::debug!("Probe {} -> HTTP {}", path, response.status);
                response.status == 200
            }
            Err(e) => {
                tracing::debug!("Probe {} failed: {}", path, e);
                false
            }
        }
    }

    /// Up to `limit` records from a ContentAPI path
    pub async fn sample_records(&self, path: &str, limit: usize) -> MetadataResult<Vec<Record>> {
        let request = ArcherRequest::get(path).with_query("$top", limit);
        let mut records: Vec<Record> = self
            .get_items(request)
            .await?
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect();
        records.truncate(limit);
        Ok(records)
    }
}

fn parse_levels(items: &[Value], module_name: Option<&str>) -> Vec<LevelMapping> {
    items
        .iter()
        .filter_map(|item| {
            let mapping = LevelMapping::from_value(item, module_name);
            if mapping.is_none() {
                tracing::debug!("Skipping deleted or alias-less level: {}", item);
            }
            mapping
        })
        .collect()
}

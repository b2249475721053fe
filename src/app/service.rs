//! Top-level orchestration of sessions, metadata, and records
//!
//! [`ArcherService`] owns one [`SessionManager`] and one
//! [`ApplicationFieldCache`] and is the entry point used by the CLI. Every
//! call authenticates through the session manager, so cooldowns apply
//! uniformly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::cache::{ApplicationFieldCache, CacheConfig, CacheStats, CachedApplication};
use crate::app::client::{ArcherClient, TransportFactory};
use crate::app::clock::SharedClock;
use crate::app::metadata::MetadataApi;
use crate::app::models::{ApplicationInfo, Connection, Record};
use crate::app::retrieval::{
    synthetic_record, RecordRetriever, RetrievalConfig, StopReason, TotalCount,
};
use crate::app::session::{SessionManager, SessionStatus};
use crate::errors::Result;

/// Runtime configuration of the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub retrieval: RetrievalConfig,
}

/// Which records to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordQuery {
    /// One page, numbered from 1
    Page { page: usize, size: usize },
    /// Every record
    All,
    /// Batched read capped at `max` records
    Paginated { max: Option<usize> },
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self::Page { page: 1, size: 100 }
    }
}

/// Records of one application together with how they were obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSet {
    pub application: ApplicationInfo,
    /// ContentAPI path read, or `None` when only the placeholder is returned
    pub endpoint: Option<String>,
    pub records: Vec<Record>,
    pub total_count: TotalCount,
    /// Page served, for page queries
    pub page_number: Option<usize>,
    /// Why a batched read stopped
    pub stop_reason: Option<StopReason>,
    /// Whether keys were translated to display names
    pub translated: bool,
}

/// Session-aware, cached access to Archer applications
#[derive(Debug)]
pub struct ArcherService {
    sessions: SessionManager,
    cache: ApplicationFieldCache,
    retrieval: RetrievalConfig,
}

impl ArcherService {
    pub fn new(config: ServiceConfig, factory: Arc<dyn TransportFactory>, clock: SharedClock) -> Self {
        Self {
            sessions: SessionManager::new(factory, clock.clone()),
            cache: ApplicationFieldCache::new(config.cache, clock),
            retrieval: config.retrieval,
        }
    }

    pub fn cache(&self) -> &ApplicationFieldCache {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Authenticated client for a connection
    ///
    /// # Errors
    ///
    /// Returns the authentication or cooldown error
    pub async fn connect(&self, connection: &Connection) -> Result<Arc<ArcherClient>> {
        Ok(self.sessions.get_client(connection).await?)
    }

    async fn metadata_api(&self, connection: &Connection) -> Result<MetadataApi> {
        Ok(MetadataApi::new(self.connect(connection).await?))
    }

    /// Resolve an application by numeric id or by name
    async fn application(&self, api: &MetadataApi, application: &str) -> Result<ApplicationInfo> {
        let application = application.trim();
        let id = application.parse::<i64>().ok();
        let name = if id.is_some() { "" } else { application };
        Ok(self.cache.find_application(api, id, name).await?)
    }

    /// Records of an application
    ///
    /// Field metadata is brought up to date first so the records can be
    /// filtered to active fields and keyed by display name; `raw` skips
    /// both steps. An application without a resolvable endpoint yields a
    /// single placeholder record.
    ///
    /// # Errors
    ///
    /// Returns authentication errors, `MetadataError::ApplicationNotFound`,
    /// or a retrieval error that could not be degraded
    pub async fn get_records(
        &self,
        connection: &Connection,
        application: &str,
        query: RecordQuery,
        raw: bool,
    ) -> Result<RecordSet> {
        let api = self.metadata_api(connection).await?;
        let info = self.application(&api, application).await?;
        let entry = self.cache.get(&api, info.id, &info.name).await?;

        let endpoint = match &entry.endpoint {
            Some(endpoint) => Some(endpoint.clone()),
            None => self.cache.resolve_endpoint(&api, &info.name).await,
        };

        let Some(endpoint) = endpoint else {
            warn!("No ContentAPI endpoint for '{}'; returning placeholder", info.name);
            return Ok(RecordSet {
                records: vec![synthetic_record(&info)],
                application: info,
                endpoint: None,
                total_count: TotalCount::Sampled(1),
                page_number: None,
                stop_reason: None,
                translated: false,
            });
        };

        let retriever = RecordRetriever::new(api.client().clone(), &endpoint, self.retrieval.clone());
        let (records, total_count, page_number, stop_reason) = match query {
            RecordQuery::Page { page, size } => {
                let page = retriever.fetch_page(size, page).await?;
                (page.records, page.total_count, Some(page.page_number), None)
            }
            RecordQuery::All => {
                let outcome = retriever.fetch_all().await?;
                let total = TotalCount::Sampled(outcome.records.len());
                (outcome.records, total, None, Some(outcome.stop_reason))
            }
            RecordQuery::Paginated { max } => {
                let outcome = retriever.fetch_paginated(max).await?;
                let total = TotalCount::Sampled(outcome.records.len());
                (outcome.records, total, None, Some(outcome.stop_reason))
            }
        };

        let records = if raw {
            records
        } else {
            self.cache
                .translation()
                .translate_records(info.id, records)
                .await
        };

        info!("Retrieved {} record(s) of '{}'", records.len(), info.name);
        Ok(RecordSet {
            application: info,
            endpoint: Some(endpoint),
            records,
            total_count,
            page_number,
            stop_reason,
            translated: !raw,
        })
    }

    /// Cached metadata of an application, refreshed if needed
    ///
    /// # Errors
    ///
    /// Returns authentication errors or `MetadataError::ApplicationNotFound`
    pub async fn get_fields(
        &self,
        connection: &Connection,
        application: &str,
    ) -> Result<Arc<CachedApplication>> {
        let api = self.metadata_api(connection).await?;
        let info = self.application(&api, application).await?;
        Ok(self.cache.get(&api, info.id, &info.name).await?)
    }

    /// Refetch an application's metadata now
    ///
    /// # Errors
    ///
    /// Same as [`get_fields`](Self::get_fields)
    pub async fn refresh_application(
        &self,
        connection: &Connection,
        application: &str,
    ) -> Result<Arc<CachedApplication>> {
        let api = self.metadata_api(connection).await?;
        let info = self.application(&api, application).await?;
        Ok(self
            .cache
            .refresh_application(&api, info.id, &info.name)
            .await?)
    }

    /// Drop one application's cached metadata
    pub async fn invalidate_application(&self, application_id: i64) -> bool {
        self.cache.invalidate(application_id).await
    }

    /// Drop every cached application and every pooled session
    pub async fn clear_all(&self) {
        self.cache.clear_all().await;
        self.sessions.clear_all().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Authentication state of a connection, without logging in
    pub async fn auth_status(&self, connection: &Connection) -> SessionStatus {
        self.sessions.status(connection).await
    }
}

//! Application metadata cache with single-flight refresh
//!
//! This module contains [`ApplicationFieldCache`], which owns the cached
//! applications, the cached application and level lists, and the translation
//! layer built from them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::clock::{chrono_duration, SharedClock};
use crate::app::metadata::{FieldExtractor, LevelResolver, MetadataApi};
use crate::app::models::{ApplicationInfo, FieldDefinition, LevelMapping};
use crate::app::translation::{TranslationLayer, TranslationMapping};
use crate::errors::{MetadataError, MetadataResult};

use super::config::CacheConfig;
use super::entry::{CacheState, CachedApplication};
use super::stats::{CacheStats, StatsCounters};
use super::ApplicationStore;

type Timestamped<T> = Option<(Arc<T>, DateTime<Utc>)>;

/// Cache of per-application metadata
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct ApplicationFieldCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    config: CacheConfig,
    clock: SharedClock,
    applications: ApplicationStore,
    /// Applications and questionnaires, refetched after the application TTL
    application_list: RwLock<Timestamped<Vec<ApplicationInfo>>>,
    /// Every level on the instance, for endpoint resolution
    level_index: RwLock<Timestamped<LevelResolver>>,
    translation: TranslationLayer,
    refresh_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    background: StdMutex<HashSet<i64>>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    stats: StatsCounters,
    generation: std::sync::atomic::AtomicU64,
}

impl ApplicationFieldCache {
    /// Create an empty cache
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        let applications: ApplicationStore = Arc::new(RwLock::new(HashMap::new()));
        let translation = TranslationLayer::new(applications.clone(), clock.clone());

        info!(
            "Initialized metadata cache (ttl {:?}, field ttl {:?}, max {} entries)",
            config.application_cache_ttl,
            config.field_cache_ttl,
            config.max_application_cache_entries
        );

        Self {
            inner: Arc::new(CacheInner {
                config,
                clock,
                applications,
                application_list: RwLock::new(None),
                level_index: RwLock::new(None),
                translation,
                refresh_locks: Mutex::new(HashMap::new()),
                background: StdMutex::new(HashSet::new()),
                tasks: StdMutex::new(Vec::new()),
                stats: StatsCounters::default(),
                generation: std::sync::atomic::AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Translation layer backed by this cache
    pub fn translation(&self) -> &TranslationLayer {
        &self.inner.translation
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Cached metadata for an application, refreshing it if needed
    ///
    /// Fresh entries are returned as-is. Stale-approaching entries are
    /// returned as-is and refreshed in the background. Expired or absent
    /// entries are refreshed before returning.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::ApplicationNotFound` if the application is
    /// unknown, or the error that prevented listing applications
    pub async fn get(
        &self,
        api: &MetadataApi,
        application_id: i64,
        name: &str,
    ) -> MetadataResult<Arc<CachedApplication>> {
        self.cleanup().await;

        if let Some(entry) = self.peek(application_id).await {
            match entry.state(self.now(), &self.inner.config) {
                CacheState::Fresh => {
                    self.inner.stats.record_hit();
                    self.ensure_mapping(&entry).await;
                    return Ok(entry);
                }
                CacheState::StaleApproaching => {
                    self.inner.stats.record_hit();
                    self.ensure_mapping(&entry).await;
                    self.spawn_background_refresh(api, application_id, name, entry.generation);
                    return Ok(entry);
                }
                CacheState::Expired | CacheState::Absent => {}
            }
        }

        self.inner.stats.record_miss();
        let lock = self.refresh_lock(application_id).await;
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(entry) = self.peek(application_id).await {
            if entry.state(self.now(), &self.inner.config) != CacheState::Expired {
                debug!("Application {} was refreshed concurrently", application_id);
                self.ensure_mapping(&entry).await;
                return Ok(entry);
            }
        }

        self.refresh_locked(api, application_id, name).await
    }

    /// Refetch an application's metadata regardless of its state
    ///
    /// A caller that waited while another refresh of the same application
    /// completed gets that result instead of refetching.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get)
    pub async fn refresh_application(
        &self,
        api: &MetadataApi,
        application_id: i64,
        name: &str,
    ) -> MetadataResult<Arc<CachedApplication>> {
        let seen = self.peek(application_id).await.map(|entry| entry.generation);
        self.refresh_unless_changed(api, application_id, name, seen)
            .await
    }

    async fn refresh_unless_changed(
        &self,
        api: &MetadataApi,
        application_id: i64,
        name: &str,
        seen_generation: Option<u64>,
    ) -> MetadataResult<Arc<CachedApplication>> {
        let lock = self.refresh_lock(application_id).await;
        let _guard = lock.lock().await;

        if let Some(entry) = self.peek(application_id).await {
            if Some(entry.generation) != seen_generation {
                debug!("Reusing concurrent refresh of application {}", application_id);
                return Ok(entry);
            }
        }

        self.refresh_locked(api, application_id, name).await
    }

    async fn refresh_lock(&self, application_id: i64) -> Arc<Mutex<()>> {
        self.inner
            .refresh_locks
            .lock()
            .await
            .entry(application_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget refresh locks nobody is holding or waiting on
    async fn release_refresh_locks(&self, application_ids: &[i64]) {
        let mut locks = self.inner.refresh_locks.lock().await;
        for id in application_ids {
            if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(id);
            }
        }
    }

    fn spawn_background_refresh(
        &self,
        api: &MetadataApi,
        application_id: i64,
        name: &str,
        seen_generation: u64,
    ) {
        {
            let mut background = self
                .inner
                .background
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if !background.insert(application_id) {
                debug!("Background refresh of application {} already running", application_id);
                return;
            }
        }

        self.inner.stats.record_background_refresh();
        debug!("Starting background refresh of application {}", application_id);

        let cache = self.clone();
        let api = api.clone();
        let name = name.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = cache
                .refresh_unless_changed(&api, application_id, &name, Some(seen_generation))
                .await
            {
                warn!("Background refresh of application {} failed: {}", application_id, e);
            }
            cache
                .inner
                .background
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&application_id);
        });

        let mut tasks = self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Wait for every background refresh started so far
    pub async fn drain_background_refreshes(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Background refresh task panicked: {}", e);
            }
        }
    }

    /// Fetch, assemble, and store an application's metadata
    ///
    /// Callers must hold the application's refresh lock.
    async fn refresh_locked(
        &self,
        api: &MetadataApi,
        application_id: i64,
        name: &str,
    ) -> MetadataResult<Arc<CachedApplication>> {
        let application = self.find_application(api, Some(application_id), name).await?;
        let now = self.now();

        let levels = match api
            .fetch_levels_for_module(application.id, &application.name)
            .await
        {
            Ok(levels) => levels,
            Err(e) => {
                warn!(
                    "Levels for '{}' unavailable, caching without metadata: {}",
                    application.name, e
                );
                Vec::new()
            }
        };

        let (fields, endpoint) = if levels.is_empty() {
            self.fields_without_levels(api, &application, now).await
        } else {
            let per_level = join_all(
                levels
                    .iter()
                    .map(|level| self.fields_for_level(api, application.id, level, now)),
            )
            .await;

            let endpoint = LevelResolver::new(levels.clone())
                .find_level_mapping(&application.name)
                .or_else(|| levels.first())
                .map(LevelMapping::content_path);
            (per_level.into_iter().flatten().collect(), endpoint)
        };

        let generation = self
            .inner
            .generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        let entry = CachedApplication::new(
            application,
            levels,
            fields,
            endpoint,
            now,
            &self.inner.config,
            generation,
        );
        let entry = if entry.fields.is_empty() {
            warn!(
                "No field metadata for '{}', retrying after {:?}",
                entry.application.name, self.inner.config.degraded_entry_ttl
            );
            Arc::new(entry.with_lifetime(self.inner.config.degraded_entry_ttl))
        } else {
            Arc::new(entry)
        };

        self.inner
            .applications
            .write()
            .await
            .insert(application_id, entry.clone());
        self.enforce_capacity(Some(application_id)).await;
        self.inner
            .translation
            .create_field_translation_mapping(application_id, &entry.fields)
            .await;
        self.inner.stats.record_refresh();

        info!(
            "Cached '{}' ({} level(s), {} field(s))",
            entry.application.name,
            entry.levels.len(),
            entry.fields.len()
        );
        if entry.is_degraded() {
            warn!("'{}' is cached without level metadata", entry.application.name);
        }
        Ok(entry)
    }

    /// Fields of one level, inferred from sample records when none are defined
    async fn fields_for_level(
        &self,
        api: &MetadataApi,
        application_id: i64,
        level: &LevelMapping,
        now: DateTime<Utc>,
    ) -> Vec<FieldDefinition> {
        match FieldExtractor::fetch_fields_for_level(api, level, now).await {
            Ok(fields) if !fields.is_empty() => return fields,
            Ok(_) => debug!("Level {} defines no active fields", level.level_id),
            Err(e) => warn!("{}", e),
        }

        match FieldExtractor::sample_fields_for_level(
            api,
            application_id,
            level,
            &level.content_path(),
            self.inner.config.sample_record_limit,
            now,
        )
        .await
        {
            Ok(fields) => fields,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Sample-based fields for an application without level metadata
    async fn fields_without_levels(
        &self,
        api: &MetadataApi,
        application: &ApplicationInfo,
        now: DateTime<Utc>,
    ) -> (Vec<FieldDefinition>, Option<String>) {
        let Some(endpoint) = self.resolve_endpoint(api, &application.name).await else {
            return (Vec::new(), None);
        };

        let alias = endpoint.rsplit('/').next().unwrap_or_default().to_string();
        let level = LevelMapping {
            level_id: 0,
            name: application.name.clone(),
            alias,
            module_name: application.name.clone(),
            module_id: application.id,
        };

        let fields = match FieldExtractor::sample_fields_for_level(
            api,
            application.id,
            &level,
            &endpoint,
            self.inner.config.sample_record_limit,
            now,
        )
        .await
        {
            Ok(fields) => fields,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        };
        (fields, Some(endpoint))
    }

    /// Look up an application by id, falling back to a case-insensitive name
    ///
    /// The cached application list is refetched once when it has no match.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::ApplicationNotFound` if neither list has it
    pub async fn find_application(
        &self,
        api: &MetadataApi,
        application_id: Option<i64>,
        name: &str,
    ) -> MetadataResult<ApplicationInfo> {
        let (list, from_cache) = self.application_list(api, false).await?;
        if let Some(found) = match_application(&list, application_id, name) {
            return Ok(found);
        }

        if from_cache {
            debug!("'{}' not in cached application list, refetching", name);
            let (list, _) = self.application_list(api, true).await?;
            if let Some(found) = match_application(&list, application_id, name) {
                return Ok(found);
            }
        }

        Err(MetadataError::ApplicationNotFound {
            application: match application_id {
                Some(id) if name.is_empty() => id.to_string(),
                _ => name.to_string(),
            },
        })
    }

    async fn application_list(
        &self,
        api: &MetadataApi,
        force: bool,
    ) -> MetadataResult<(Arc<Vec<ApplicationInfo>>, bool)> {
        let ttl = chrono_duration(self.inner.config.application_cache_ttl);
        if !force {
            if let Some((list, fetched_at)) = self.inner.application_list.read().await.as_ref() {
                if self.now() - *fetched_at < ttl {
                    return Ok((list.clone(), true));
                }
            }
        }

        let list = Arc::new(api.fetch_applications().await?);
        *self.inner.application_list.write().await = Some((list.clone(), self.now()));
        Ok((list, false))
    }

    /// ContentAPI path for an application name
    ///
    /// Uses the instance-wide level list, then endpoint probing. A failing
    /// level list only disables the first step.
    pub async fn resolve_endpoint(&self, api: &MetadataApi, application: &str) -> Option<String> {
        let resolver = self.level_index(api).await;
        resolver.resolve_content_endpoint(api, application).await
    }

    async fn level_index(&self, api: &MetadataApi) -> Arc<LevelResolver> {
        let ttl = chrono_duration(self.inner.config.application_cache_ttl);
        if let Some((resolver, fetched_at)) = self.inner.level_index.read().await.as_ref() {
            if self.now() - *fetched_at < ttl {
                return resolver.clone();
            }
        }

        match api.fetch_all_levels().await {
            Ok(levels) => {
                let resolver = Arc::new(LevelResolver::new(levels));
                *self.inner.level_index.write().await = Some((resolver.clone(), self.now()));
                resolver
            }
            Err(e) => {
                warn!("Level list unavailable, resolving endpoints by probing: {}", e);
                Arc::new(LevelResolver::default())
            }
        }
    }

    async fn ensure_mapping(&self, entry: &CachedApplication) {
        let translation = &self.inner.translation;
        if !translation.contains(entry.application_id()).await {
            translation
                .create_field_translation_mapping(entry.application_id(), &entry.fields)
                .await;
        }
    }

    /// Remove expired entries, stale translation mappings, and any excess entries
    pub async fn cleanup(&self) {
        let now = self.now();
        let expired = {
            let mut applications = self.inner.applications.write().await;
            let before = applications.len();
            applications.retain(|_, entry| now < entry.cache_expires_at);
            before - applications.len()
        };
        if expired > 0 {
            debug!("Removed {} expired application entr(ies)", expired);
            self.inner.stats.record_expirations(expired);
        }

        let stale = self
            .inner
            .translation
            .remove_older_than(self.inner.config.field_cache_ttl, now)
            .await;
        if stale > 0 {
            debug!("Removed {} stale translation mapping(s)", stale);
        }

        self.enforce_capacity(None).await;
    }

    /// Evict least recently updated entries until at the cap
    async fn enforce_capacity(&self, keep: Option<i64>) {
        let max = self.inner.config.max_application_cache_entries;
        let evicted: Vec<i64> = {
            let mut applications = self.inner.applications.write().await;
            let mut evicted = Vec::new();
            while applications.len() > max {
                let oldest = applications
                    .iter()
                    .filter(|(id, _)| Some(**id) != keep)
                    .min_by_key(|(_, entry)| entry.last_updated)
                    .map(|(id, _)| *id);
                match oldest {
                    Some(id) => {
                        applications.remove(&id);
                        evicted.push(id);
                    }
                    None => break,
                }
            }
            evicted
        };

        for id in &evicted {
            self.inner.translation.remove(*id).await;
            debug!("Evicted application {} to stay under the cache cap", id);
        }
        self.release_refresh_locks(&evicted).await;
        if !evicted.is_empty() {
            self.inner.stats.record_evictions(evicted.len());
        }
    }

    /// Drop one application's entry and mapping
    pub async fn invalidate(&self, application_id: i64) -> bool {
        let removed = self
            .inner
            .applications
            .write()
            .await
            .remove(&application_id)
            .is_some();
        let mapping_removed = self.inner.translation.remove(application_id).await;
        self.release_refresh_locks(&[application_id]).await;
        if removed || mapping_removed {
            info!("Invalidated cached metadata for application {}", application_id);
        }
        removed
    }

    /// Drop every entry, mapping, and cached list
    pub async fn clear_all(&self) {
        let count = {
            let mut applications = self.inner.applications.write().await;
            let count = applications.len();
            applications.clear();
            count
        };
        self.inner.translation.clear().await;
        self.inner
            .refresh_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        *self.inner.application_list.write().await = None;
        *self.inner.level_index.write().await = None;
        info!("Cleared {} cached application(s)", count);
    }

    /// Current entry without any freshness check
    pub async fn peek(&self, application_id: i64) -> Option<Arc<CachedApplication>> {
        self.inner
            .applications
            .read()
            .await
            .get(&application_id)
            .cloned()
    }

    /// Freshness of an application's entry
    pub async fn state(&self, application_id: i64) -> CacheState {
        match self.peek(application_id).await {
            Some(entry) => entry.state(self.now(), &self.inner.config),
            None => CacheState::Absent,
        }
    }

    pub async fn get_translation_mapping(&self, application_id: i64) -> Option<TranslationMapping> {
        self.inner.translation.mapping(application_id).await
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.inner.applications.read().await.len();
        let translation_entries = self.inner.translation.len().await;
        self.inner.stats.snapshot(entries, translation_entries)
    }
}

fn match_application(
    list: &[ApplicationInfo],
    application_id: Option<i64>,
    name: &str,
) -> Option<ApplicationInfo> {
    if let Some(id) = application_id {
        if let Some(found) = list.iter().find(|app| app.id == id) {
            return Some(found.clone());
        }
    }

    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    list.iter()
        .find(|app| {
            app.name.eq_ignore_ascii_case(name)
                || app
                    .alias
                    .as_deref()
                    .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{ArcherClient, Method};
    use crate::app::clock::SharedClock;
    use crate::app::models::ApplicationKind;
    use crate::constants::endpoints;
    use crate::testkit::clock::ManualClock;
    use crate::testkit::fixtures;
    use crate::testkit::transport::{Scripted, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;

    type Harness = (
        ApplicationFieldCache,
        MetadataApi,
        Arc<ScriptedTransport>,
        Arc<ManualClock>,
    );

    fn setup(config: CacheConfig) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        transport.get_json(
            endpoints::APPLICATIONS,
            fixtures::wrapped(vec![
                fixtures::application(75, "Risk Register"),
                fixtures::application(76, "Controls"),
            ]),
        );
        transport.get_json(endpoints::QUESTIONNAIRES, fixtures::wrapped(vec![]));
        transport.get_json(
            "/api/core/system/level/module/75",
            fixtures::wrapped(vec![fixtures::level(42, "Risk", "Risk_Register", 75)]),
        );
        transport.get_json(
            "/api/core/system/fielddefinition/level/42",
            fixtures::wrapped(vec![
                fixtures::field(1, "Risk Title", "Risk_Title", 1),
                fixtures::inactive_field(2, "Legacy", "Legacy"),
            ]),
        );

        let clock = Arc::new(ManualClock::at_epoch());
        let shared: SharedClock = clock.clone();
        let connection = fixtures::connection().with_session_token("TOKEN", None);
        let client = Arc::new(ArcherClient::new(connection, transport.clone(), shared.clone()));
        let cache = ApplicationFieldCache::new(config, shared);
        (cache, MetadataApi::new(client), transport, clock)
    }

    #[tokio::test]
    async fn test_refresh_builds_entry_and_mapping() {
        let (cache, api, transport, _clock) = setup(CacheConfig::default());

        let entry = cache.get(&api, 75, "Risk Register").await.unwrap();
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(entry.endpoint.as_deref(), Some("/contentapi/Risk_Register"));
        assert!(cache.get_translation_mapping(75).await.is_some());

        // Second read is a hit
        cache.get(&api, 75, "Risk Register").await.unwrap();
        assert_eq!(transport.count_for("/api/core/system/level/module/75"), 1);

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.refreshes), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_unknown_application() {
        let (cache, api, transport, _clock) = setup(CacheConfig::default());

        let error = cache.get(&api, 999, "Nope").await.unwrap_err();
        assert!(matches!(error, MetadataError::ApplicationNotFound { .. }));
        // a freshly fetched list is not refetched
        assert_eq!(transport.count_for(endpoints::APPLICATIONS), 1);

        let error = cache.get(&api, 999, "Nope").await.unwrap_err();
        assert!(matches!(error, MetadataError::ApplicationNotFound { .. }));
        assert_eq!(transport.count_for(endpoints::APPLICATIONS), 2);
    }

    #[tokio::test]
    async fn test_failed_levels_degrade_to_empty_entry() {
        let (cache, api, transport, _clock) = setup(CacheConfig::default());
        transport.push(
            Method::Get,
            "/api/core/system/level/module/76",
            &[],
            Scripted::status(500, json!(null)),
        );
        transport.push(Method::Get, endpoints::LEVELS, &[], Scripted::Network("reset".into()));

        let entry = cache.get(&api, 76, "Controls").await.unwrap();
        assert!(entry.is_degraded());
        assert!(entry.fields.is_empty());
        assert!(entry.endpoint.is_none());
    }

    #[tokio::test]
    async fn test_entry_without_fields_expires_early() {
        let (cache, api, transport, clock) = setup(CacheConfig::default());
        transport.handle(Method::Get, "/api/core/system/fielddefinition/level/42", |_| {
            Scripted::status(500, json!(null))
        });
        transport.handle(Method::Get, "/contentapi/Risk_Register", |_| {
            Scripted::status(500, json!(null))
        });

        let entry = cache.get(&api, 75, "Risk Register").await.unwrap();
        assert!(entry.fields.is_empty());
        assert_eq!(
            entry.cache_expires_at,
            crate::testkit::clock::epoch() + chrono::Duration::seconds(60)
        );

        clock.advance_seconds(61);
        cache.get(&api, 75, "Risk Register").await.unwrap();
        assert_eq!(transport.count_for("/api/core/system/level/module/75"), 2);
    }

    #[tokio::test]
    async fn test_refresh_locks_released() {
        let config = CacheConfig::default().with_max_entries(1);
        let (cache, api, _transport, _clock) = setup(config);

        cache.get(&api, 75, "Risk Register").await.unwrap();
        assert!(cache.invalidate(75).await);
        assert!(cache.inner.refresh_locks.lock().await.is_empty());

        // 76 evicts 75
        cache.get(&api, 75, "Risk Register").await.unwrap();
        cache.get(&api, 76, "Controls").await.unwrap();
        assert_eq!(cache.state(75).await, CacheState::Absent);
        assert!(!cache.inner.refresh_locks.lock().await.contains_key(&75));

        cache.clear_all().await;
        assert!(cache.inner.refresh_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_forced_refresh_replaces_entry() {
        let (cache, api, _transport, clock) = setup(CacheConfig::default());

        let first = cache.get(&api, 75, "Risk Register").await.unwrap();
        clock.advance_minutes(1);
        let second = cache.refresh_application(&api, 75, "Risk Register").await.unwrap();

        assert!(second.generation > first.generation);
        assert!(second.last_updated > first.last_updated);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (cache, api, _transport, _clock) = setup(CacheConfig::default());
        cache.get(&api, 75, "Risk Register").await.unwrap();

        assert_eq!(cache.state(75).await, CacheState::Fresh);
        assert!(cache.invalidate(75).await);
        assert!(!cache.invalidate(75).await);
        assert_eq!(cache.state(75).await, CacheState::Absent);
        assert!(cache.get_translation_mapping(75).await.is_none());

        cache.get(&api, 75, "Risk Register").await.unwrap();
        cache.clear_all().await;
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_translation_mapping_expires_before_entry() {
        let config = CacheConfig::default().with_field_ttl(Duration::from_secs(60));
        let (cache, api, transport, clock) = setup(config);
        cache.get(&api, 75, "Risk Register").await.unwrap();

        clock.advance_minutes(2);
        cache.cleanup().await;
        assert!(cache.get_translation_mapping(75).await.is_none());

        // A read of the still-fresh entry rebuilds the mapping without refetching
        cache.get(&api, 75, "Risk Register").await.unwrap();
        assert!(cache.get_translation_mapping(75).await.is_some());
        assert_eq!(transport.count_for("/api/core/system/level/module/75"), 1);
    }

    #[test]
    fn test_match_application_by_id_then_name() {
        let list: Vec<ApplicationInfo> = [(75, "Risk Register"), (76, "Controls")]
            .into_iter()
            .filter_map(|(id, name)| {
                ApplicationInfo::from_value(fixtures::application(id, name), ApplicationKind::Application)
            })
            .collect();

        assert_eq!(match_application(&list, Some(76), "whatever").unwrap().id, 76);
        assert_eq!(match_application(&list, Some(1), "risk register").unwrap().id, 75);
        assert_eq!(match_application(&list, None, "RISK_REGISTER").unwrap().id, 75);
        assert!(match_application(&list, None, "").is_none());
    }
}

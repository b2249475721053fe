//! Shared setup for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use archer_fetcher::app::cache::CacheConfig;
use archer_fetcher::app::{ArcherService, ServiceConfig};
use archer_fetcher::constants::endpoints;
use archer_fetcher::testkit::clock::ManualClock;
use archer_fetcher::testkit::fixtures;
use archer_fetcher::testkit::transport::{Scripted, ScriptedFactory, ScriptedTransport};
use serde_json::Value;

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub clock: Arc<ManualClock>,
    pub service: ArcherService,
}

impl Harness {
    pub fn new(cache: CacheConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let clock = Arc::new(ManualClock::at_epoch());
        let factory = Arc::new(ScriptedFactory::new(transport.clone()));
        let config = ServiceConfig {
            cache,
            ..ServiceConfig::default()
        };
        let service = ArcherService::new(config, factory, clock.clone());

        transport.post(endpoints::LOGIN, Scripted::ok(fixtures::login_ok("TOKEN-1")));
        transport.get_json(endpoints::QUESTIONNAIRES, fixtures::wrapped(vec![]));

        Self {
            transport,
            clock,
            service,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Script the application list
    pub fn applications(&self, applications: Vec<Value>) {
        self.transport
            .get_json(endpoints::APPLICATIONS, fixtures::wrapped(applications));
    }

    /// Script one level of a module with the given field definitions
    pub fn module(&self, module_id: i64, level: Value, level_id: i64, fields: Vec<Value>) {
        self.transport.get_json(
            &levels_path(module_id),
            fixtures::wrapped(vec![level]),
        );
        self.transport
            .get_json(&fields_path(level_id), fixtures::wrapped(fields));
    }

    pub fn level_fetches(&self, module_id: i64) -> usize {
        self.transport.count_for(&levels_path(module_id))
    }
}

pub fn levels_path(module_id: i64) -> String {
    format!("{}/{}", endpoints::LEVELS_BY_MODULE, module_id)
}

pub fn fields_path(level_id: i64) -> String {
    format!("{}/{}", endpoints::FIELD_DEFINITIONS_BY_LEVEL, level_id)
}

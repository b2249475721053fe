//! Prelude module for Archer Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use archer_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use archer_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (client_config, service_config) = AppConfig::load(None).await?.to_runtime_config()?;
//!     let factory = Arc::new(HttpTransportFactory::new(client_config));
//!     let service = ArcherService::new(service_config, factory, system_clock());
//!
//!     let connection = resolve_connection()?;
//!     let fields = service.get_fields(&connection, "Risk Register").await?;
//!     println!("{} fields", fields.fields.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Core orchestration
    ArcherService,
    RecordQuery,
    RecordSet,
    ServiceConfig,

    // Essential components
    ApplicationFieldCache,
    ArcherClient,
    HttpTransportFactory,
    SessionManager,
    TranslationLayer,

    // Configuration
    CacheConfig,
    ClientConfig,
    RetrievalConfig,

    // Data and status types
    ApplicationInfo,
    CacheState,
    CacheStats,
    CachedApplication,
    Connection,
    FieldDefinition,
    FieldType,
    LevelMapping,
    Record,
    SessionStatus,
    TotalCount,
};
pub use crate::app::clock::{system_clock, Clock, SharedClock};

// Configuration file loading
pub use crate::config::AppConfig;

// Credential functions
pub use crate::auth::{get_auth_status, load_dotenv, resolve_connection, AuthStatus};

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, ENV_PASSWORD, ENV_USERNAME, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::clock::ManualClock;
    use crate::testkit::transport::{ScriptedFactory, ScriptedTransport};

    #[test]
    fn test_prelude_imports() {
        let _cache_config = CacheConfig::default();
        let _client_config = ClientConfig::default();
        let _retrieval_config = RetrievalConfig::default();

        let _auth_status = get_auth_status();

        assert_eq!(DEFAULT_RATE_LIMIT_RPS, 10);
        assert!(USER_AGENT.contains("Archer-Fetcher"));
    }

    #[tokio::test]
    async fn test_prelude_integration_pattern() {
        let (_, service_config) = AppConfig::default().to_runtime_config().unwrap();
        let factory = Arc::new(ScriptedFactory::new(Arc::new(ScriptedTransport::new())));
        let service = ArcherService::new(service_config, factory, Arc::new(ManualClock::at_epoch()));

        let stats = service.cache_stats().await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }
}

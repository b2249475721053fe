//! Core application logic for Archer Fetcher
//!
//! This module contains the client and session layers, the metadata cache,
//! alias translation, and record retrieval, tied together by
//! [`ArcherService`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use archer_fetcher::app::{ArcherService, ClientConfig, HttpTransportFactory, RecordQuery, ServiceConfig};
//! use archer_fetcher::app::clock::system_clock;
//! use archer_fetcher::app::models::Connection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = Arc::new(HttpTransportFactory::new(ClientConfig::default()));
//! let service = ArcherService::new(ServiceConfig::default(), factory, system_clock());
//!
//! let connection = Connection::new("https://grc.example.com", "Prod", "analyst")
//!     .with_password("secret");
//! let set = service
//!     .get_records(&connection, "Risk Register", RecordQuery::default(), false)
//!     .await?;
//! println!("{} records", set.records.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod envelope;
pub mod metadata;
pub mod models;
pub mod retrieval;
pub mod service;
pub mod session;
pub mod translation;

// Re-export main public API
pub use cache::{ApplicationFieldCache, CacheConfig, CacheState, CacheStats, CachedApplication};
pub use client::{ArcherClient, ClientConfig, HttpTransportFactory};
pub use metadata::{FieldExtractor, LevelResolver, MetadataApi};
pub use models::{ApplicationInfo, Connection, FieldDefinition, FieldType, LevelMapping, Record};
pub use retrieval::{RecordPage, RecordRetriever, RetrievalConfig, TotalCount};
pub use service::{ArcherService, RecordQuery, RecordSet, ServiceConfig};
pub use session::{SessionManager, SessionStatus};
pub use translation::{TranslationLayer, TranslationMapping};

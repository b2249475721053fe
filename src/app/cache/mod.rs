//! In-memory cache of application metadata
//!
//! One [`CachedApplication`] per application id holds its levels, active field
//! definitions, and ContentAPI endpoint. Entries move through
//! `Absent -> Fresh -> StaleApproaching -> Expired`; reads of a
//! stale-approaching entry return it immediately and refresh it in the
//! background, reads of an expired or absent entry refresh synchronously.
//!
//! # Module Organization
//!
//! - [`config`] - TTLs, entry cap, and auto-refresh threshold
//! - [`entry`] - cached entries and their freshness states
//! - [`stats`] - hit, miss, refresh, and eviction counters
//! - [`manager`] - [`ApplicationFieldCache`] with single-flight refresh
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use archer_fetcher::app::cache::{ApplicationFieldCache, CacheConfig};
//! use archer_fetcher::app::clock::system_clock;
//! use archer_fetcher::app::metadata::MetadataApi;
//!
//! # async fn example(api: MetadataApi) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ApplicationFieldCache::new(CacheConfig::default(), system_clock());
//! let entry = cache.get(&api, 75, "Risk Register").await?;
//! println!("{} active fields", entry.fields.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

pub mod config;
pub mod entry;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use entry::{CacheState, CachedApplication};
pub use manager::ApplicationFieldCache;
pub use stats::CacheStats;

/// Cached applications by id, shared with the translation layer
pub type ApplicationStore = Arc<RwLock<HashMap<i64, Arc<CachedApplication>>>>;

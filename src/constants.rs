//! Application constants for Archer Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for connection settings and credentials
pub mod env {
    /// Base URL of the Archer instance (e.g. `https://grc.example.com`)
    pub const BASE_URL: &str = "ARCHER_BASE_URL";

    /// Archer instance name used at login
    pub const INSTANCE: &str = "ARCHER_INSTANCE";

    /// Archer username
    pub const USERNAME: &str = "ARCHER_USERNAME";

    /// Archer password
    pub const PASSWORD: &str = "ARCHER_PASSWORD";

    /// Optional user domain id
    pub const USER_DOMAIN: &str = "ARCHER_USER_DOMAIN";

    /// Optional pre-issued session token
    pub const SESSION_TOKEN: &str = "ARCHER_SESSION_TOKEN";
}

/// Archer REST endpoint paths
pub mod endpoints {
    /// Login endpoint
    pub const LOGIN: &str = "/api/core/security/login";

    /// Application list
    pub const APPLICATIONS: &str = "/api/core/system/application";

    /// Questionnaire list
    pub const QUESTIONNAIRES: &str = "/api/core/system/questionnaire";

    /// All levels
    pub const LEVELS: &str = "/api/core/system/level";

    /// Levels for one module, followed by the module id
    pub const LEVELS_BY_MODULE: &str = "/api/core/system/level/module";

    /// Field definitions for one level, followed by the level id
    pub const FIELD_DEFINITIONS_BY_LEVEL: &str = "/api/core/system/fielddefinition/level";

    /// ContentAPI root, followed by the level alias
    pub const CONTENT_API: &str = "/contentapi";
}

/// Authentication and session constants
pub mod auth {
    use super::Duration;

    /// Fixed lease granted to a session after a successful login
    pub const SESSION_LEASE: Duration = Duration::from_secs(20 * 60);

    /// Minutes of cooldown added per consecutive failed login
    pub const COOLDOWN_STEP_MINUTES: i64 = 5;

    /// Upper bound on the login cooldown
    pub const MAX_COOLDOWN_MINUTES: i64 = 30;

    /// Number of session token characters used in the pool key
    pub const TOKEN_KEY_PREFIX_LEN: usize = 8;

    /// Pool key component used when no session token is supplied
    pub const NO_SESSION_SENTINEL: &str = "no-session";

    /// Authorization header scheme prefix
    pub const SESSION_HEADER_SCHEME: &str = "Archer session-id=";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Archer-Fetcher/0.1.0 (GRC Metadata Client)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for Archer requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Maximum retry attempts for throttled or overloaded responses
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
}

/// Metadata cache defaults
pub mod cache {
    use super::Duration;

    /// How long a cached application stays authoritative
    pub const APPLICATION_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

    /// How long a translation mapping stays authoritative
    pub const FIELD_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

    /// Maximum number of cached applications
    pub const MAX_APPLICATION_ENTRIES: usize = 50;

    /// Fraction of the TTL after which a background refresh is triggered
    pub const AUTO_REFRESH_THRESHOLD: f64 = 0.8;

    /// Number of sample records pulled when field definitions are missing
    pub const SAMPLE_RECORD_LIMIT: usize = 5;

    /// Lifetime of an entry cached without any field metadata
    pub const DEGRADED_ENTRY_TTL: Duration = Duration::from_secs(60);
}

/// Field extraction constants
pub mod fields {
    /// Synthetic field ids start above this value
    pub const SYNTHETIC_ID_BASE: i64 = 1000;

    /// Exact record keys that are never treated as fields
    pub const SYSTEM_KEYS: [&str; 3] = ["Id", "LevelId", "ModuleId"];

    /// Key prefix of vendor-internal record properties
    pub const SYSTEM_PREFIX: &str = "__";

    /// Substring marking vendor metadata properties
    pub const METADATA_MARKER: &str = "metadata";
}

/// Record retrieval constants
pub mod retrieval {
    use super::Duration;

    /// Records per pagination batch
    pub const BATCH_SIZE: usize = 1000;

    /// Batch size used for the single retry after a network error
    pub const REDUCED_BATCH_SIZE: usize = 500;

    /// Batches at or below this size are not retried
    pub const MIN_RETRY_BATCH_SIZE: usize = 100;

    /// Soft deadline for a whole retrieval loop
    pub const TIME_BUDGET: Duration = Duration::from_secs(25);

    /// Pause inserted every `PAUSE_EVERY_BATCHES` batches
    pub const BATCH_PAUSE: Duration = Duration::from_millis(100);

    /// Batch cadence for the pause above
    pub const PAUSE_EVERY_BATCHES: usize = 5;

    /// `$top` used by the single-shot "all records" request
    pub const ALL_RECORDS_TOP: usize = 10_000;

    /// Sample size used to serve page 1 and estimate a total
    pub const PAGE_SAMPLE_SIZE: usize = 1000;

    /// Extended sample size when the first sample came back full
    pub const EXTENDED_SAMPLE_SIZE: usize = 10_000;

    /// Floor for the approximate total reported on later pages
    pub const MIN_APPROXIMATE_TOTAL: usize = 100;
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};

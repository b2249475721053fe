//! Error types for Archer Fetcher
//!
//! This module defines the error types for all components of the application.
//! Each subsystem has its own enum so callers can tell fatal failures (login
//! rejected, cooldown active) apart from the degradable ones (a level that
//! could not be fetched, a batch that timed out).

use std::path::PathBuf;
use thiserror::Error;

/// Low-level transport errors raised by an [`ArcherTransport`](crate::app::client::ArcherTransport)
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded its deadline
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Connection could not be established or was reset
    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Response body was not valid JSON
    #[error("Failed to decode response body: {reason}")]
    Decode { reason: String },
}

impl TransportError {
    /// Whether this error represents an expired deadline rather than a hard failure
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Authentication and session errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Too many recent failed logins for this connection
    #[error(
        "Authentication cooldown active after {failures} failed attempt(s). Try again in {remaining_minutes} minute(s)"
    )]
    CooldownActive {
        remaining_minutes: i64,
        failures: u32,
    },

    /// No password and no usable session token
    #[error(
        "Missing Archer credentials. Set ARCHER_PASSWORD or supply a valid ARCHER_SESSION_TOKEN"
    )]
    MissingCredentials,

    /// Platform rejected the login request
    #[error("Archer login rejected: {messages}")]
    LoginRejected { messages: String },

    /// Connection settings are unusable
    #[error("Invalid connection settings: {reason}")]
    InvalidConnection { reason: String },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Login response had an unexpected shape
    #[error("Unexpected login response: {reason}")]
    InvalidResponse { reason: String },

    /// Transport failed during authentication
    #[error("Transport failure during authentication: {0}")]
    Transport(#[from] TransportError),

    /// Terminal I/O error while prompting for credentials
    #[error("Failed to read credentials from terminal")]
    Prompt(#[from] std::io::Error),
}

/// Metadata resolution and cache refresh errors
#[derive(Error, Debug)]
pub enum MetadataError {
    /// No ContentAPI endpoint could be found for the application
    #[error("No ContentAPI endpoint could be resolved for application '{application}'")]
    EndpointUnresolved { application: String },

    /// Field definitions for one level could not be fetched
    #[error("Failed to fetch field definitions for level {level_id}: {reason}")]
    LevelFetchFailed { level_id: i64, reason: String },

    /// Field inference from sample records failed
    #[error("Failed to extract fields from sample records: {reason}")]
    MetadataExtractionFailed { reason: String },

    /// Application is not present in the application list
    #[error("Application not found: {application}")]
    ApplicationNotFound { application: String },

    /// Response had an unexpected shape
    #[error("Invalid metadata response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    /// Endpoint answered with a non-success status
    #[error("Metadata endpoint {endpoint} returned HTTP {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    /// Transport failure
    #[error("Transport failure while fetching metadata: {0}")]
    Transport(#[from] TransportError),
}

/// Record retrieval errors
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// A batch exceeded its deadline
    #[error("Batch at offset {skip} timed out after {seconds} seconds")]
    BatchTimeout { skip: usize, seconds: u64 },

    /// A batch failed for a reason other than a timeout
    #[error("Batch at offset {skip} failed: {reason}")]
    BatchNetworkError { skip: usize, reason: String },

    /// ContentAPI response had an unexpected shape
    #[error("Invalid ContentAPI response: {reason}")]
    InvalidResponse { reason: String },

    /// The requested page starts beyond any addressable offset
    #[error("Page {page} of size {page_size} is out of range")]
    PageOutOfRange { page: usize, page_size: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Metadata error
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Retrieval error
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Transport(e) | AppError::Metadata(MetadataError::Transport(e)) => {
                e.is_timeout()
                    || matches!(
                        e,
                        TransportError::Http(_)
                            | TransportError::Connection { .. }
                            | TransportError::RateLimitExceeded
                            | TransportError::ServerOverloaded
                    )
            }
            AppError::Auth(AuthError::CooldownActive { .. })
            | AppError::Auth(AuthError::Transport(_))
            | AppError::Retrieval(RetrievalError::BatchTimeout { .. })
            | AppError::Retrieval(RetrievalError::BatchNetworkError { .. })
            | AppError::Metadata(MetadataError::LevelFetchFailed { .. }) => true,

            AppError::Auth(AuthError::LoginRejected { .. })
            | AppError::Auth(AuthError::MissingCredentials)
            | AppError::Metadata(MetadataError::ApplicationNotFound { .. })
            | AppError::Retrieval(RetrievalError::PageOutOfRange { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Metadata(_) => "metadata",
            AppError::Retrieval(_) => "retrieval",
            AppError::Transport(_) => "transport",
            AppError::Config(_) => "config",
            AppError::Json(_) => "serialization",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Metadata result type alias
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// Retrieval result type alias
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let cooldown = AppError::Auth(AuthError::CooldownActive {
            remaining_minutes: 5,
            failures: 1,
        });
        assert_eq!(cooldown.category(), "authentication");
        assert!(cooldown.is_recoverable());

        let rejected = AppError::Auth(AuthError::LoginRejected {
            messages: "Invalid credentials".to_string(),
        });
        assert!(!rejected.is_recoverable());

        let missing = AppError::Metadata(MetadataError::ApplicationNotFound {
            application: "Risk Register".to_string(),
        });
        assert_eq!(missing.category(), "metadata");
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn test_transport_timeout_detection() {
        assert!(TransportError::Timeout { seconds: 25 }.is_timeout());
        assert!(!TransportError::ServerOverloaded.is_timeout());

        let app_error = AppError::Transport(TransportError::Timeout { seconds: 120 });
        assert!(app_error.is_recoverable());
        assert_eq!(app_error.category(), "transport");
    }

    #[test]
    fn test_cooldown_message_reports_minutes() {
        let error = AuthError::CooldownActive {
            remaining_minutes: 12,
            failures: 3,
        };
        let message = error.to_string();
        assert!(message.contains("12 minute"));
        assert!(message.contains("3 failed"));
    }
}

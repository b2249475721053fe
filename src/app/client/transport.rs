//! Transport seam between the Archer client and the network
//!
//! Every platform call is expressed as an [`ArcherRequest`] and executed by an
//! [`ArcherTransport`]. Non-success statuses come back as ordinary
//! [`ArcherResponse`] values so callers decide what a 404 or 401 means for
//! them; only failures to obtain a response at all are errors.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::app::models::Connection;
use crate::errors::{AuthResult, TransportError, TransportResult};

/// HTTP method of a platform request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One platform request
#[derive(Debug, Clone, PartialEq)]
pub struct ArcherRequest {
    pub method: Method,
    /// Path relative to the instance base URL (e.g., `/contentapi/Risk_Register`)
    pub path: String,
    /// Query parameters in order
    pub query: Vec<(String, String)>,
    /// JSON body for `POST`
    pub body: Option<Value>,
    /// Session token for the `Authorization` header
    pub session_token: Option<String>,
    /// Per-request deadline overriding the client default
    pub timeout: Option<Duration>,
}

impl ArcherRequest {
    /// `GET` request for a path
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            session_token: None,
            timeout: None,
        }
    }

    /// `POST` request carrying a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(path)
        }
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a session token
    pub fn with_session(mut self, token: Option<String>) -> Self {
        self.session_token = token;
        self
    }

    /// Set a per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded JSON body of a platform response
#[derive(Debug, Clone, PartialEq)]
pub struct ArcherResponse {
    pub status: u16,
    /// Decoded body, `Null` when empty
    pub body: Value,
}

impl ArcherResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes platform requests
#[async_trait]
pub trait ArcherTransport: Send + Sync + Debug {
    /// Base URL requests are resolved against
    fn base_url(&self) -> &Url;

    /// Execute one request
    async fn execute(&self, request: ArcherRequest) -> TransportResult<ArcherResponse>;
}

/// Builds a transport for a connection
pub trait TransportFactory: Send + Sync + Debug {
    /// Create the transport used by the pooled client for `connection`
    fn create(&self, connection: &Connection) -> AuthResult<Arc<dyn ArcherTransport>>;
}

/// Parse and normalize an instance base URL
///
/// # Errors
///
/// Returns `TransportError::InvalidUrl` if the URL cannot be parsed or is
/// not http(s)
pub fn parse_base_url(raw: &str) -> TransportResult<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_string(),
        error: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransportError::InvalidUrl {
            url: raw.to_string(),
            error: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Resolve a request path and query against the base URL
///
/// Any path prefix of the base URL (e.g., `/RSAarcher`) is preserved.
pub fn resolve_url(base: &Url, request: &ArcherRequest) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{}{}", prefix, request.path));

    if !request.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }

    url
}

//! Core HTTP operations with rate limiting and retry logic
//!
//! [`HttpHandler`] is the production [`ArcherTransport`]: it rate limits with
//! `governor`, retries throttled (429) and overloaded (503) responses as well
//! as connection failures with exponential backoff, and decodes JSON bodies.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::app::client::transport::{
    parse_base_url, resolve_url, ArcherRequest, ArcherResponse, ArcherTransport, Method,
    TransportFactory,
};
use crate::app::models::Connection;
use crate::constants::{auth, limits};
use crate::errors::{AuthError, AuthResult, TransportError, TransportResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler for one Archer instance
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` if the rate limit is zero
    pub fn new(client: Client, base_url: Url, config: &ClientConfig) -> TransportResult<Self> {
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            base_url,
            request_timeout: config.request_timeout,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(rate_limit_rps: u32) -> TransportResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| TransportError::InvalidUrl {
            url: String::new(),
            error: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Delay before retry attempt `retries`
    fn backoff_delay(retries: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries))
    }

    /// Sends one request with rate limiting and retry logic
    async fn send(&self, request: &ArcherRequest) -> TransportResult<Response> {
        let url = resolve_url(&self.base_url, request);
        let timeout = request.timeout.unwrap_or(self.request_timeout);

        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;

            let mut builder = match request.method {
                Method::Get => self.client.get(url.clone()),
                Method::Post => self.client.post(url.clone()),
            }
            .timeout(timeout);

            if let Some(token) = &request.session_token {
                builder = builder.header(
                    AUTHORIZATION,
                    format!("{}\"{}\"", auth::SESSION_HEADER_SCHEME, token),
                );
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == 429 || status == 503 {
                        if retries < limits::MAX_RETRIES {
                            retries += 1;
                            let delay = Self::backoff_delay(retries);
                            tracing::warn!(
                                "Archer responded {} for {}. Backing off for {}ms",
                                status,
                                request.path,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == 429 {
                            TransportError::RateLimitExceeded
                        } else {
                            TransportError::ServerOverloaded
                        });
                    }

                    tracing::debug!("{} {} -> {}", method_name(request.method), request.path, status);
                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!("Request to {} timed out", request.path);
                    return Err(TransportError::Timeout {
                        seconds: timeout.as_secs(),
                    });
                }
                Err(e) if e.is_connect() && retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = Self::backoff_delay(retries);
                    tracing::warn!(
                        "Connection to {} failed (attempt {}/{}): {}. Retrying in {}ms",
                        self.base_url,
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_connect() => {
                    tracing::error!(
                        "Connection failed after {} retries: {}",
                        limits::MAX_RETRIES,
                        e
                    );
                    return Err(TransportError::MaxRetriesExceeded {
                        max_retries: limits::MAX_RETRIES,
                    });
                }
                Err(e) => return Err(TransportError::Http(e)),
            }
        }
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ArcherTransport for HttpHandler {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn execute(&self, request: ArcherRequest) -> TransportResult<ArcherResponse> {
        let response = self.send(&request).await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                // Error pages are often HTML; the status is what matters there
                Err(_) if !(200..300).contains(&status) => Value::Null,
                Err(e) => {
                    return Err(TransportError::Decode {
                        reason: format!("{} from {}", e, request.path),
                    })
                }
            }
        };

        Ok(ArcherResponse::new(status, body))
    }
}

fn method_name(method: Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
    }
}

/// Creates one [`HttpHandler`] per pooled connection
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    config: ClientConfig,
}

impl HttpTransportFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, connection: &Connection) -> AuthResult<Arc<dyn ArcherTransport>> {
        let base_url = parse_base_url(&connection.base_url).map_err(|e| {
            AuthError::InvalidConnection {
                reason: e.to_string(),
            }
        })?;
        let client = self.config.build_http_client()?;
        let handler = HttpHandler::new(client, base_url, &self.config)?;

        tracing::debug!("Created HTTP transport for {}", connection.base_url);
        Ok(Arc::new(handler))
    }
}

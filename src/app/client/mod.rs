//! HTTP client implementation for Archer platform interaction
//!
//! This module provides the authenticated client used by every other layer.
//! The module is organized into specialized components:
//! - `transport`: the request/response seam and transport factory trait
//! - `config`: HTTP client configuration and building
//! - `http`: `reqwest` transport with rate limiting and backoff
//! - `auth`: login payload construction and response parsing

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::app::clock::SharedClock;
use crate::app::models::{Connection, Session};
use crate::app::session::ConnectionKey;
use crate::errors::{AuthResult, TransportResult};

pub mod auth;
pub mod config;
pub mod http;
pub mod transport;

pub use config::ClientConfig;
pub use http::{HttpHandler, HttpTransportFactory};
pub use transport::{ArcherRequest, ArcherResponse, ArcherTransport, Method, TransportFactory};

use auth::AuthHandler;

/// Authenticated client for one logical Archer connection
///
/// Holds a private copy of the caller's connection settings; only the
/// session is ever replaced.
#[derive(Debug)]
pub struct ArcherClient {
    connection: Connection,
    key: ConnectionKey,
    transport: Arc<dyn ArcherTransport>,
    session: RwLock<Option<Session>>,
    auth_lock: Mutex<()>,
    clock: SharedClock,
}

impl ArcherClient {
    /// Creates a client, adopting any session token supplied with the connection
    ///
    /// A token supplied without an expiry receives the standard lease from now.
    pub fn new(
        connection: Connection,
        transport: Arc<dyn ArcherTransport>,
        clock: SharedClock,
    ) -> Self {
        let session = connection
            .session_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .map(|token| match connection.session_expires_at {
                Some(expires_at) => Session {
                    token: token.clone(),
                    expires_at,
                },
                None => Session::leased(token.clone(), clock.now()),
            });

        Self {
            key: ConnectionKey::from_connection(&connection),
            connection,
            transport,
            session: RwLock::new(session),
            auth_lock: Mutex::new(()),
            clock,
        }
    }

    /// Connection settings this client was created from
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Pool identity of this client
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Lock serializing authentication attempts for this client
    pub(crate) fn auth_lock(&self) -> &Mutex<()> {
        &self.auth_lock
    }

    /// Whether the current session is usable now
    pub async fn has_valid_session(&self) -> bool {
        let now = self.clock.now();
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.is_valid(now))
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Token of the current session, if still valid
    pub async fn session_token(&self) -> Option<String> {
        let now = self.clock.now();
        self.session
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_valid(now))
            .map(|session| session.token.clone())
    }

    /// Drop the current session so the next use re-authenticates
    pub async fn invalidate_session(&self) {
        if self.session.write().await.take().is_some() {
            tracing::debug!("Discarded session for {}", self.key);
        }
    }

    /// Authenticate unless a valid session already exists
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if no password is configured,
    /// `AuthError::LoginRejected` if the platform refuses the login, or a
    /// transport error
    pub async fn authenticate(&self) -> AuthResult<()> {
        if self.has_valid_session().await {
            tracing::debug!("Reusing valid session for {}", self.key);
            return Ok(());
        }

        let request = AuthHandler::login_request(&self.connection)?;
        tracing::info!(
            "Logging in to {} as {} (instance {})",
            self.connection.base_url,
            self.connection.username,
            self.connection.instance_id
        );

        let response = self.transport.execute(request).await?;
        let token = AuthHandler::parse_login_response(response)?;

        let session = Session::leased(token, self.clock.now());
        tracing::info!(
            "Authenticated {}; session valid until {}",
            self.key,
            session.expires_at
        );
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Execute a request with the current session attached
    pub async fn execute(&self, request: ArcherRequest) -> TransportResult<ArcherResponse> {
        let token = self.session_token().await;
        self.transport.execute(request.with_session(token)).await
    }

    /// Underlying transport
    pub fn transport(&self) -> &Arc<dyn ArcherTransport> {
        &self.transport
    }
}

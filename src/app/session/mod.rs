//! Connection pooling and authentication with login cooldown
//!
//! [`SessionManager`] hands out one [`ArcherClient`] per logical connection
//! and guarantees it is authenticated before returning it. Repeated login
//! failures for a connection put it into a cooldown during which callers fail
//! fast without touching the network. Authentication for one connection is
//! single-flight: concurrent callers queue on the client's auth lock and the
//! later ones observe the session the first one obtained.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::app::client::{ArcherClient, TransportFactory};
use crate::app::clock::SharedClock;
use crate::app::models::Connection;
use crate::errors::AuthResult;

pub mod failure;
pub mod key;

pub use failure::{FailureRecord, FailureTracker};
pub use key::ConnectionKey;

/// Authentication state of one connection, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub connection: String,
    pub pooled: bool,
    pub has_valid_session: bool,
    pub session_expires_at: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub cooldown_remaining_minutes: Option<i64>,
}

/// Pool of authenticated clients keyed by connection identity
#[derive(Debug)]
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    clock: SharedClock,
    clients: RwLock<HashMap<ConnectionKey, Arc<ArcherClient>>>,
    failures: FailureTracker,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn TransportFactory>, clock: SharedClock) -> Self {
        Self {
            factory,
            clock,
            clients: RwLock::new(HashMap::new()),
            failures: FailureTracker::new(),
        }
    }

    /// Get the pooled client for `connection`, authenticating it if needed
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CooldownActive` without any network call while the
    /// connection is cooling down, or the error of a failed login
    pub async fn get_client(&self, connection: &Connection) -> AuthResult<Arc<ArcherClient>> {
        let client = self.pooled_client(connection).await?;
        self.ensure_authenticated(&client).await?;
        Ok(client)
    }

    /// Look up or create the pooled client without authenticating it
    async fn pooled_client(&self, connection: &Connection) -> AuthResult<Arc<ArcherClient>> {
        let key = ConnectionKey::from_connection(connection);

        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let transport = self.factory.create(connection)?;
        let client = Arc::new(ArcherClient::new(
            connection.clone(),
            transport,
            self.clock.clone(),
        ));
        tracing::debug!("Pooled new client for {}", key);
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Make sure `client` holds a valid session
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CooldownActive` during cooldown; any login failure
    /// is counted against the connection and returned
    pub async fn ensure_authenticated(&self, client: &ArcherClient) -> AuthResult<()> {
        let key = client.key();
        self.failures.check(key, self.clock.now()).await?;

        if client.has_valid_session().await {
            return Ok(());
        }

        let _guard = client.auth_lock().lock().await;

        // A concurrent caller may have finished while we waited
        self.failures.check(key, self.clock.now()).await?;
        if client.has_valid_session().await {
            return Ok(());
        }

        match client.authenticate().await {
            Ok(()) => {
                if self.failures.clear(key).await {
                    tracing::info!("Cleared login failures for {}", key);
                }
                Ok(())
            }
            Err(e) => {
                let record = self.failures.record_failure(key, self.clock.now()).await;
                tracing::warn!(
                    "Authentication failed for {} ({} consecutive): {}. Cooling down for {} minutes",
                    key,
                    record.count,
                    e,
                    record.cooldown_minutes()
                );
                Err(e)
            }
        }
    }

    /// Drop every pooled client and failure record
    pub async fn clear_all(&self) {
        let dropped = {
            let mut clients = self.clients.write().await;
            let count = clients.len();
            clients.clear();
            count
        };
        self.failures.clear_all().await;
        tracing::info!("Cleared {} pooled Archer client(s)", dropped);
    }

    /// Consecutive failed logins for `connection`
    pub async fn failure_count(&self, connection: &Connection) -> u32 {
        let key = ConnectionKey::from_connection(connection);
        self.failures.get(&key).await.map_or(0, |record| record.count)
    }

    /// Minutes until `connection` may attempt to log in again
    pub async fn cooldown_remaining(&self, connection: &Connection) -> Option<i64> {
        let key = ConnectionKey::from_connection(connection);
        self.failures
            .get(&key)
            .await
            .and_then(|record| record.remaining_minutes(self.clock.now()))
    }

    /// Number of pooled clients
    pub async fn pooled_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Authentication state of `connection` without triggering a login
    pub async fn status(&self, connection: &Connection) -> SessionStatus {
        let key = ConnectionKey::from_connection(connection);
        let client = self.clients.read().await.get(&key).cloned();

        let (has_valid_session, session_expires_at) = match &client {
            Some(client) => (
                client.has_valid_session().await,
                client.session().await.map(|session| session.expires_at),
            ),
            None => (false, None),
        };

        SessionStatus {
            connection: key.to_string(),
            pooled: client.is_some(),
            has_valid_session,
            session_expires_at,
            failure_count: self.failure_count(connection).await,
            cooldown_remaining_minutes: self.cooldown_remaining(connection).await,
        }
    }
}

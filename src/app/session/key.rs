//! Pool identity of a logical connection

use std::fmt;

use crate::app::models::Connection;
use crate::constants::auth;

/// Composite key identifying one pooled client
///
/// Two connections share a client only when instance, user, domain, and the
/// leading characters of any supplied session token all agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    base_url: String,
    instance_id: String,
    username: String,
    user_domain_id: String,
    token_prefix: String,
}

impl ConnectionKey {
    pub fn from_connection(connection: &Connection) -> Self {
        let token_prefix = connection
            .session_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| token.chars().take(auth::TOKEN_KEY_PREFIX_LEN).collect())
            .unwrap_or_else(|| auth::NO_SESSION_SENTINEL.to_string());

        Self {
            base_url: connection.base_url.trim_end_matches('/').to_lowercase(),
            instance_id: connection.instance_id.clone(),
            username: connection.username.clone(),
            user_domain_id: connection.user_domain_id.clone().unwrap_or_default(),
            token_prefix,
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.base_url, self.instance_id, self.username, self.user_domain_id, self.token_prefix
        )
    }
}

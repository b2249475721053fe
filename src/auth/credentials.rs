//! Credential loading for Archer connections
//!
//! Connection settings come from `ARCHER_*` environment variables, after any
//! `.env` file in the working directory has been loaded. When neither a
//! password nor a session token is configured and stdin is a terminal, the
//! password is prompted for without echo.

use std::env::{self, VarError};
use std::path::Path;

use serde::Serialize;

use crate::app::models::Connection;
use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

/// Which connection settings are present in the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub base_url_set: bool,
    pub instance_set: bool,
    pub username_set: bool,
    pub password_set: bool,
    pub session_token_set: bool,
    /// Whether a .env file exists in the current directory
    pub dotenv_file_exists: bool,
}

impl AuthStatus {
    /// Whether the instance is fully identified
    pub fn has_connection(&self) -> bool {
        self.base_url_set && self.instance_set && self.username_set
    }

    /// Whether a login can proceed without prompting
    pub fn has_credentials(&self) -> bool {
        self.has_connection() && (self.password_set || self.session_token_set)
    }

    /// Descriptive status message for display
    pub fn status_message(&self) -> String {
        if !self.has_connection() {
            return format!(
                "Missing connection settings - set {}, {} and {}",
                env_constants::BASE_URL,
                env_constants::INSTANCE,
                env_constants::USERNAME
            );
        }
        match (self.password_set, self.session_token_set) {
            (true, true) => "Password and session token configured".to_string(),
            (true, false) => "Password configured".to_string(),
            (false, true) => "Session token configured (no password to renew it)".to_string(),
            (false, false) => "No password or session token - will prompt if interactive".to_string(),
        }
    }
}

/// Load `.env` from the working directory, if present
pub fn load_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }
}

/// Check which settings the environment provides
pub fn get_auth_status() -> AuthStatus {
    let is_set = |name: &str| env::var(name).is_ok_and(|value| !value.is_empty());
    AuthStatus {
        base_url_set: is_set(env_constants::BASE_URL),
        instance_set: is_set(env_constants::INSTANCE),
        username_set: is_set(env_constants::USERNAME),
        password_set: is_set(env_constants::PASSWORD),
        session_token_set: is_set(env_constants::SESSION_TOKEN),
        dotenv_file_exists: Path::new(".env").exists(),
    }
}

/// Build connection settings from the process environment
///
/// # Errors
///
/// Returns `AuthError::InvalidConnection` naming the first missing required
/// variable, or `AuthError::EnvVar` for non-Unicode values
pub fn connection_from_env() -> AuthResult<Connection> {
    connection_from_vars(|name| env::var(name))
}

/// Build connection settings from a variable lookup
pub fn connection_from_vars<F>(lookup: F) -> AuthResult<Connection>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let optional = |name: &str| -> AuthResult<Option<String>> {
        match lookup(name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        }
    };
    let required = |name: &str| -> AuthResult<String> {
        optional(name)?.ok_or_else(|| AuthError::InvalidConnection {
            reason: format!("{} is not set", name),
        })
    };

    let mut connection = Connection::new(
        required(env_constants::BASE_URL)?,
        required(env_constants::INSTANCE)?,
        required(env_constants::USERNAME)?,
    );
    // Passwords are taken verbatim
    if let Ok(password) = lookup(env_constants::PASSWORD) {
        if !password.is_empty() {
            connection = connection.with_password(password);
        }
    }
    if let Some(domain) = optional(env_constants::USER_DOMAIN)? {
        connection = connection.with_user_domain(domain);
    }
    if let Some(token) = optional(env_constants::SESSION_TOKEN)? {
        connection = connection.with_session_token(token, None);
    }
    Ok(connection)
}

/// Prompt for the password without echo
///
/// # Errors
///
/// Returns `AuthError::Prompt` if the terminal cannot be read, or
/// `AuthError::MissingCredentials` for an empty password
pub fn prompt_password(connection: &Connection) -> AuthResult<String> {
    let prompt = format!(
        "Archer password for {} ({}): ",
        connection.username, connection.instance_id
    );
    let password = rpassword::prompt_password(prompt)?;
    if password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(password)
}

/// Connection settings from the environment, prompting for a password if needed
///
/// # Errors
///
/// Returns the error of [`connection_from_env`] or [`prompt_password`]
pub fn resolve_connection() -> AuthResult<Connection> {
    let connection = connection_from_env()?;
    if connection.has_password() || connection.session_token.is_some() {
        return Ok(connection);
    }

    if atty::is(atty::Stream::Stdin) {
        let password = prompt_password(&connection)?;
        return Ok(connection.with_password(password));
    }

    tracing::debug!("No password or session token and stdin is not a terminal");
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_connection_from_vars() {
        let connection = connection_from_vars(lookup(&[
            ("ARCHER_BASE_URL", "https://grc.example.com/"),
            ("ARCHER_INSTANCE", "Prod"),
            ("ARCHER_USERNAME", " analyst "),
            ("ARCHER_PASSWORD", " p@ss "),
            ("ARCHER_USER_DOMAIN", ""),
        ]))
        .unwrap();

        assert_eq!(connection.base_url, "https://grc.example.com/");
        assert_eq!(connection.username, "analyst");
        assert_eq!(connection.password.as_deref(), Some(" p@ss "));
        assert!(connection.user_domain_id.is_none());
        assert!(connection.session_token.is_none());
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let error = connection_from_vars(lookup(&[
            ("ARCHER_BASE_URL", "https://grc.example.com"),
            ("ARCHER_USERNAME", "analyst"),
        ]))
        .unwrap_err();

        match error {
            AuthError::InvalidConnection { reason } => assert!(reason.contains("ARCHER_INSTANCE")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_session_token_only() {
        let connection = connection_from_vars(lookup(&[
            ("ARCHER_BASE_URL", "https://grc.example.com"),
            ("ARCHER_INSTANCE", "Prod"),
            ("ARCHER_USERNAME", "analyst"),
            ("ARCHER_SESSION_TOKEN", "ABCDEF123456"),
        ]))
        .unwrap();

        assert!(!connection.has_password());
        assert_eq!(connection.session_token.as_deref(), Some("ABCDEF123456"));
    }

    #[test]
    fn test_auth_status_messages() {
        let mut status = AuthStatus {
            base_url_set: true,
            instance_set: true,
            username_set: false,
            password_set: false,
            session_token_set: false,
            dotenv_file_exists: false,
        };
        assert!(status.status_message().contains("Missing connection settings"));
        assert!(!status.has_credentials());

        status.username_set = true;
        assert!(status.status_message().contains("will prompt"));

        status.session_token_set = true;
        assert!(status.has_credentials());
        assert!(status.status_message().contains("Session token"));
    }
}

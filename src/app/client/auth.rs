//! Archer login request construction and response parsing
//!
//! The platform answers a login with a `RequestedObject` envelope whose
//! `SessionToken` is used on every later request. Rejections come back either
//! as `IsSuccessful: false` with validation messages, or as a non-success
//! status.

use serde_json::{json, Value};

use crate::app::client::transport::{ArcherRequest, ArcherResponse};
use crate::app::envelope::{str_field, validation_messages};
use crate::app::models::Connection;
use crate::constants::endpoints;
use crate::errors::{AuthError, AuthResult};

/// Handles Archer authentication payloads
pub struct AuthHandler;

impl AuthHandler {
    /// Build the login request for a connection
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if no password is configured
    pub fn login_request(connection: &Connection) -> AuthResult<ArcherRequest> {
        let password = connection
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let body = json!({
            "InstanceName": connection.instance_id,
            "Username": connection.username,
            "UserDomain": connection.user_domain_id.as_deref().unwrap_or(""),
            "Password": password,
        });

        Ok(ArcherRequest::post(endpoints::LOGIN, body))
    }

    /// Extract the session token from a login response
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginRejected` with the platform's messages joined
    /// by `", "`, or `AuthError::InvalidResponse` if a successful response
    /// carries no token
    pub fn parse_login_response(response: ArcherResponse) -> AuthResult<String> {
        let status = response.status;
        let Value::Object(body) = response.body else {
            if (200..300).contains(&status) {
                return Err(AuthError::InvalidResponse {
                    reason: "login response body is not an object".to_string(),
                });
            }
            return Err(AuthError::LoginRejected {
                messages: format!("HTTP {status}"),
            });
        };

        let is_successful = body
            .get("IsSuccessful")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !(200..300).contains(&status) || !is_successful {
            let messages = body
                .get("ValidationMessages")
                .map(validation_messages)
                .unwrap_or_default();
            let messages = if messages.is_empty() {
                format!("HTTP {status}, no validation messages")
            } else {
                messages.join(", ")
            };
            return Err(AuthError::LoginRejected { messages });
        }

        body.get("RequestedObject")
            .and_then(Value::as_object)
            .and_then(|obj| str_field(obj, "SessionToken"))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidResponse {
                reason: "RequestedObject.SessionToken missing".to_string(),
            })
    }
}

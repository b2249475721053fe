//! Data models for Archer Fetcher
//!
//! This module defines the core data structures shared by the session, cache,
//! translation, and retrieval layers: connection settings, sessions, level
//! mappings, and field definitions, along with the parsing of their vendor
//! JSON representations.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::envelope::{bool_field, i64_field, str_field};
use crate::constants::auth;

/// A single ContentAPI record
pub type Record = Map<String, Value>;

/// Caller-supplied settings for one logical Archer connection
///
/// The session fields are the only part ever mutated, and only on the
/// pooled client's private copy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Base URL of the instance (e.g., `https://grc.example.com`)
    pub base_url: String,
    /// Login username
    pub username: String,
    /// Login password, absent when only a session token is supplied
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Archer instance name
    pub instance_id: String,
    /// Optional user domain id
    #[serde(default)]
    pub user_domain_id: Option<String>,
    /// Optional pre-issued session token
    #[serde(default, skip_serializing)]
    pub session_token: Option<String>,
    /// Expiry of the pre-issued session token
    #[serde(default)]
    pub session_expires_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Create connection settings without credentials
    pub fn new(
        base_url: impl Into<String>,
        instance_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: None,
            instance_id: instance_id.into(),
            user_domain_id: None,
            session_token: None,
            session_expires_at: None,
        }
    }

    /// Set the login password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the user domain id
    pub fn with_user_domain(mut self, user_domain_id: impl Into<String>) -> Self {
        self.user_domain_id = Some(user_domain_id.into());
        self
    }

    /// Supply an existing session token with an optional known expiry
    pub fn with_session_token(
        mut self,
        token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.session_token = Some(token.into());
        self.session_expires_at = expires_at;
        self
    }

    /// Whether a password is configured
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("instance_id", &self.instance_id)
            .field("user_domain_id", &self.user_domain_id)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("session_expires_at", &self.session_expires_at)
            .finish()
    }
}

/// An Archer session token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque session token
    pub token: String,
    /// Instant after which the token is no longer accepted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with the standard lease starting at `now`
    pub fn leased(token: impl Into<String>, now: DateTime<Utc>) -> Self {
        let lease = ChronoDuration::from_std(auth::SESSION_LEASE)
            .unwrap_or_else(|_| ChronoDuration::minutes(20));
        Self {
            token: token.into(),
            expires_at: now + lease,
        }
    }

    /// Whether the session is still usable at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Whether an entry came from the application or questionnaire list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationKind {
    Application,
    Questionnaire,
}

/// One application or questionnaire known to the platform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationInfo {
    /// Module id
    pub id: i64,
    /// Display name (e.g., "Risk Register")
    pub name: String,
    /// System alias, when reported
    pub alias: Option<String>,
    /// Numeric status code, 1 meaning active
    pub status: Option<i64>,
    /// Source list
    pub kind: ApplicationKind,
    /// The full vendor object
    pub raw: Value,
}

impl ApplicationInfo {
    /// Parse one item of the application or questionnaire list
    pub fn from_value(value: Value, kind: ApplicationKind) -> Option<Self> {
        let obj = value.as_object()?;
        let id = i64_field(obj, "Id")?;
        let name = str_field(obj, "Name")?.to_string();
        let alias = str_field(obj, "Alias").map(str::to_string);
        let status = i64_field(obj, "Status");

        Some(Self {
            id,
            name,
            alias,
            status,
            kind,
            raw: value,
        })
    }

    /// Human-readable status
    pub fn status_label(&self) -> &'static str {
        match self.status {
            Some(1) => "Active",
            Some(_) => "Inactive",
            None => "Unknown",
        }
    }
}

/// Correspondence between a level and its ContentAPI alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMapping {
    /// Level id
    pub level_id: i64,
    /// Level display name
    pub name: String,
    /// ContentAPI alias (e.g., "Risk_Register")
    pub alias: String,
    /// Name of the owning module
    pub module_name: String,
    /// Id of the owning module, equal to its application id
    pub module_id: i64,
}

impl LevelMapping {
    /// Parse a level object
    ///
    /// Returns `None` for deleted levels and for levels without an id or
    /// alias. `module_name` is used when the level does not carry its
    /// module's name.
    pub fn from_value(value: &Value, module_name: Option<&str>) -> Option<Self> {
        let obj = value.as_object()?;
        if bool_field(obj, "IsDeleted").unwrap_or(false) {
            return None;
        }

        let level_id = i64_field(obj, "Id")?;
        let alias = str_field(obj, "Alias").filter(|a| !a.is_empty())?.to_string();
        let name = str_field(obj, "Name").unwrap_or(&alias).to_string();
        let module_id = i64_field(obj, "ModuleId").unwrap_or_default();
        let module_name = str_field(obj, "ModuleName")
            .or(module_name)
            .unwrap_or(&name)
            .to_string();

        Some(Self {
            level_id,
            name,
            alias,
            module_name,
            module_id,
        })
    }

    /// ContentAPI path for this level
    pub fn content_path(&self) -> String {
        content_path(&self.alias)
    }
}

/// ContentAPI path for an alias
pub fn content_path(alias: &str) -> String {
    format!("{}/{}", crate::constants::endpoints::CONTENT_API, alias)
}

/// Field data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Numeric,
    Date,
    Boolean,
    ValuesList,
    Other(i64),
}

impl FieldType {
    /// Map a vendor numeric type code
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Text,
            2 => Self::Numeric,
            3 => Self::Date,
            4 => Self::ValuesList,
            other => Self::Other(other),
        }
    }

    /// Short lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::ValuesList => "values_list",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "other({code})"),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Definition of one field within a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field id, above 1000 for fields inferred from sample records
    pub id: i64,
    /// Display name
    pub name: String,
    /// System alias used as the record key
    pub alias: String,
    /// Data type
    pub field_type: FieldType,
    pub is_active: bool,
    pub is_calculated: bool,
    pub is_required: bool,
    pub is_key: bool,
    /// Vendor GUID, or a synthetic one for inferred fields
    pub guid: String,
    /// Owning level id
    pub level_id: i64,
    /// Owning level name
    pub level_name: String,
    /// When the definition entered the cache
    pub cached_at: DateTime<Utc>,
}

impl FieldDefinition {
    /// Parse a field definition object
    ///
    /// Fields without an alias fall back to their name; fields with neither
    /// are rejected.
    pub fn from_object(
        obj: &Map<String, Value>,
        level: &LevelMapping,
        cached_at: DateTime<Utc>,
    ) -> Option<Self> {
        let id = i64_field(obj, "Id")?;
        let name = str_field(obj, "Name").filter(|s| !s.is_empty());
        let alias = str_field(obj, "Alias").filter(|s| !s.is_empty());
        let (name, alias) = match (name, alias) {
            (Some(n), Some(a)) => (n.to_string(), a.to_string()),
            (Some(n), None) => (n.to_string(), n.to_string()),
            (None, Some(a)) => (a.to_string(), a.to_string()),
            (None, None) => return None,
        };

        Some(Self {
            id,
            name,
            alias,
            field_type: i64_field(obj, "Type")
                .map(FieldType::from_code)
                .unwrap_or(FieldType::Text),
            is_active: bool_field(obj, "IsActive").unwrap_or(true),
            is_calculated: bool_field(obj, "IsCalculated").unwrap_or(false),
            is_required: bool_field(obj, "IsRequired").unwrap_or(false),
            is_key: bool_field(obj, "IsKey").unwrap_or(false),
            guid: str_field(obj, "Guid").unwrap_or_default().to_string(),
            level_id: i64_field(obj, "LevelId").unwrap_or(level.level_id),
            level_name: level.name.clone(),
            cached_at,
        })
    }
}

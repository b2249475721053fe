//! Normalization of Archer response envelopes
//!
//! The platform wraps its payloads in several loosely-consistent shapes: an
//! array of `{RequestedObject, IsSuccessful, IsDeleted}` wrappers, a single
//! `{RequestedObject: ...}` object, an OData `{value: [...]}` body from the
//! ContentAPI, or sometimes a bare array. [`ArcherEnvelope::decode`] inspects
//! the shape once so call sites only ever see a flat list of items.

use serde_json::{Map, Value};

use crate::errors::{MetadataError, MetadataResult};

/// One element of a wrapper array
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedItem {
    /// The payload carried by the wrapper
    pub requested_object: Value,
    /// `IsSuccessful` flag, defaults to true when absent
    pub is_successful: bool,
    /// `IsDeleted` flag, defaults to false when absent
    pub is_deleted: bool,
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ArcherEnvelope {
    /// Array of `{RequestedObject, IsSuccessful, IsDeleted}` wrappers
    Wrapped(Vec<WrappedItem>),
    /// Single `{RequestedObject: ...}` object
    Requested {
        requested: Value,
        is_successful: bool,
        messages: Vec<String>,
    },
    /// ContentAPI `{value: [...]}` body
    OData(Vec<Value>),
    /// Array of plain objects
    Bare(Vec<Value>),
    /// Any other object
    Single(Value),
}

impl ArcherEnvelope {
    /// Decode a response body, inspecting its shape exactly once
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::InvalidResponse` for bodies that are neither
    /// arrays nor objects
    pub fn decode(endpoint: &str, body: Value) -> MetadataResult<Self> {
        match body {
            Value::Array(items) => {
                let is_wrapped = items
                    .first()
                    .and_then(Value::as_object)
                    .map(|obj| obj.contains_key("RequestedObject"))
                    .unwrap_or(false);

                if is_wrapped {
                    Ok(Self::Wrapped(items.into_iter().map(unwrap_item).collect()))
                } else {
                    Ok(Self::Bare(items))
                }
            }
            Value::Object(mut obj) => {
                if let Some(requested) = obj.remove("RequestedObject") {
                    let is_successful = bool_field(&obj, "IsSuccessful").unwrap_or(true);
                    let messages = obj
                        .get("ValidationMessages")
                        .map(validation_messages)
                        .unwrap_or_default();
                    return Ok(Self::Requested {
                        requested,
                        is_successful,
                        messages,
                    });
                }

                match obj.remove("value") {
                    Some(Value::Array(values)) => Ok(Self::OData(values)),
                    Some(other) => Err(MetadataError::InvalidResponse {
                        endpoint: endpoint.to_string(),
                        reason: format!("'value' is not an array: {}", type_name(&other)),
                    }),
                    None => Ok(Self::Single(Value::Object(obj))),
                }
            }
            other => Err(MetadataError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("expected array or object, got {}", type_name(&other)),
            }),
        }
    }

    /// Flatten the envelope into its items
    ///
    /// Wrappers flagged as deleted or unsuccessful are dropped. A
    /// `RequestedObject` holding an array contributes each element.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Wrapped(items) => items
                .into_iter()
                .filter(|item| item.is_successful && !item.is_deleted)
                .map(|item| item.requested_object)
                .collect(),
            Self::Requested {
                requested,
                is_successful,
                ..
            } => {
                if !is_successful {
                    return Vec::new();
                }
                match requested {
                    Value::Array(values) => values,
                    Value::Null => Vec::new(),
                    other => vec![other],
                }
            }
            Self::OData(values) | Self::Bare(values) => values,
            Self::Single(value) => vec![value],
        }
    }

    /// Items that are JSON objects, for callers that only understand records
    pub fn into_objects(self) -> Vec<Map<String, Value>> {
        self.into_items()
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect()
    }
}

fn unwrap_item(value: Value) -> WrappedItem {
    match value {
        Value::Object(mut obj) => {
            let is_successful = bool_field(&obj, "IsSuccessful").unwrap_or(true);
            let is_deleted = bool_field(&obj, "IsDeleted").unwrap_or(false);
            WrappedItem {
                requested_object: obj.remove("RequestedObject").unwrap_or(Value::Null),
                is_successful,
                is_deleted,
            }
        }
        other => WrappedItem {
            requested_object: other,
            is_successful: true,
            is_deleted: false,
        },
    }
}

/// Extract human-readable validation messages
///
/// Each message is taken from `ResourcedMessage`, then `MessageKey`, then
/// `Description`; plain strings are used as-is.
pub fn validation_messages(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => ["ResourcedMessage", "MessageKey", "Description"]
                .iter()
                .find_map(|key| str_field(obj, key).filter(|s| !s.is_empty()))
                .map(str::to_string)
                .or_else(|| Some(item.to_string())),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Read a string property
pub fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Read an integer property, accepting numeric strings
pub fn i64_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean property
pub fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapped_array_drops_deleted_and_failed() {
        let body = json!([
            {"RequestedObject": {"Id": 1}, "IsSuccessful": true, "IsDeleted": false},
            {"RequestedObject": {"Id": 2}, "IsSuccessful": true, "IsDeleted": true},
            {"RequestedObject": {"Id": 3}, "IsSuccessful": false},
            {"RequestedObject": {"Id": 4}}
        ]);

        let envelope = ArcherEnvelope::decode("/api/core/system/level", body).unwrap();
        assert!(matches!(envelope, ArcherEnvelope::Wrapped(_)));

        let ids: Vec<i64> = envelope
            .into_items()
            .iter()
            .filter_map(|v| v["Id"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_requested_object_array() {
        let body = json!({"RequestedObject": [{"Id": 7}, {"Id": 8}], "IsSuccessful": true});
        let items = ArcherEnvelope::decode("x", body).unwrap().into_items();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_odata_and_bare_arrays() {
        let odata = ArcherEnvelope::decode("x", json!({"value": [{"a": 1}]})).unwrap();
        assert_eq!(odata, ArcherEnvelope::OData(vec![json!({"a": 1})]));

        let bare = ArcherEnvelope::decode("x", json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(bare.into_objects().len(), 2);

        let empty = ArcherEnvelope::decode("x", json!([])).unwrap();
        assert!(empty.into_items().is_empty());
    }

    #[test]
    fn test_scalar_body_is_invalid() {
        let result = ArcherEnvelope::decode("/contentapi/Risk", json!("oops"));
        assert!(matches!(
            result,
            Err(MetadataError::InvalidResponse { .. })
        ));

        let result = ArcherEnvelope::decode("/contentapi/Risk", json!({"value": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_message_precedence() {
        let messages = validation_messages(&json!([
            {"ResourcedMessage": "Invalid credentials", "MessageKey": "ignored"},
            {"MessageKey": "ValidationMessageTemplates:LoginNotValid"},
            {"Description": "Account locked"},
            "plain text"
        ]));

        assert_eq!(
            messages,
            vec![
                "Invalid credentials",
                "ValidationMessageTemplates:LoginNotValid",
                "Account locked",
                "plain text"
            ]
        );
    }

    #[test]
    fn test_numeric_string_fields() {
        let obj = json!({"Id": "42", "Other": 7, "Flag": true});
        let obj = obj.as_object().unwrap();
        assert_eq!(i64_field(obj, "Id"), Some(42));
        assert_eq!(i64_field(obj, "Other"), Some(7));
        assert_eq!(bool_field(obj, "Flag"), Some(true));
        assert_eq!(str_field(obj, "Missing"), None);
    }
}

//! Field definition extraction
//!
//! Field definitions normally come from the metadata API. Some levels report
//! none, in which case a best-effort set is reconstructed from the keys and
//! values of a few sample records. Reconstructed fields get ids above 1000
//! and a GUID derived from an MD5 digest, so they never collide with real
//! definitions and stay stable across refreshes.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::app::envelope::i64_field;
use crate::app::metadata::MetadataApi;
use crate::app::models::{FieldDefinition, FieldType, LevelMapping, Record};
use crate::constants::fields;
use crate::errors::{MetadataError, MetadataResult};

/// Builds field definitions from metadata or sample records
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    /// Active field definitions of one level
    ///
    /// Keeps fields unless `IsActive` is `false` or `Status` is `0`.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::LevelFetchFailed` if the definitions cannot be
    /// fetched or decoded
    pub async fn fetch_fields_for_level(
        api: &MetadataApi,
        level: &LevelMapping,
        now: DateTime<Utc>,
    ) -> MetadataResult<Vec<FieldDefinition>> {
        let items = api
            .fetch_field_definitions(level.level_id)
            .await
            .map_err(|e| MetadataError::LevelFetchFailed {
                level_id: level.level_id,
                reason: e.to_string(),
            })?;

        let definitions: Vec<FieldDefinition> = items
            .iter()
            .filter_map(Value::as_object)
            .filter(|obj| {
                obj.get("IsActive").and_then(Value::as_bool) != Some(false)
                    && i64_field(obj, "Status") != Some(0)
            })
            .filter_map(|obj| FieldDefinition::from_object(obj, level, now))
            .collect();

        tracing::debug!(
            "Level {} ({}) has {} active field(s)",
            level.level_id,
            level.alias,
            definitions.len()
        );
        Ok(definitions)
    }

    /// Reconstruct field definitions from sample records
    ///
    /// Keys are unioned across the sample in first-seen order; system keys
    /// are skipped. Each field's type is inferred from its first non-null
    /// value.
    pub fn extract_from_sample_records(
        records: &[Record],
        application_id: i64,
        level: &LevelMapping,
        now: DateTime<Utc>,
    ) -> Vec<FieldDefinition> {
        let mut seen: Vec<(&str, Option<&Value>)> = Vec::new();

        for record in records {
            for (key, value) in record {
                if is_system_key(key) {
                    continue;
                }
                let value = (!value.is_null()).then_some(value);
                match seen.iter_mut().find(|(seen_key, _)| *seen_key == key.as_str()) {
                    Some((_, first)) => {
                        if first.is_none() {
                            *first = value;
                        }
                    }
                    None => seen.push((key.as_str(), value)),
                }
            }
        }

        seen.into_iter()
            .enumerate()
            .map(|(index, (key, value))| FieldDefinition {
                id: fields::SYNTHETIC_ID_BASE + index as i64 + 1,
                name: key.to_string(),
                alias: key.to_string(),
                field_type: value.map(infer_field_type).unwrap_or(FieldType::Text),
                is_active: true,
                is_calculated: false,
                is_required: false,
                is_key: key.to_lowercase().contains("id"),
                guid: synthetic_guid(application_id, level.level_id, key),
                level_id: level.level_id,
                level_name: level.name.clone(),
                cached_at: now,
            })
            .collect()
    }

    /// Pull up to `limit` records from the level's endpoint and reconstruct fields
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::MetadataExtractionFailed` if the sample cannot
    /// be fetched
    pub async fn sample_fields_for_level(
        api: &MetadataApi,
        application_id: i64,
        level: &LevelMapping,
        endpoint: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> MetadataResult<Vec<FieldDefinition>> {
        let records = api.sample_records(endpoint, limit).await.map_err(|e| {
            MetadataError::MetadataExtractionFailed {
                reason: format!("sampling {} failed: {}", endpoint, e),
            }
        })?;

        let definitions = Self::extract_from_sample_records(&records, application_id, level, now);
        tracing::info!(
            "Inferred {} field(s) for level {} from {} sample record(s)",
            definitions.len(),
            level.level_id,
            records.len()
        );
        Ok(definitions)
    }
}

/// Whether a record key is vendor bookkeeping rather than a field
pub fn is_system_key(key: &str) -> bool {
    key.starts_with(fields::SYSTEM_PREFIX)
        || key.to_lowercase().contains(fields::METADATA_MARKER)
        || fields::SYSTEM_KEYS.contains(&key)
}

/// Infer a field type from one sample value
///
/// Precedence is numeric, boolean, date (a `YYYY-MM-DD` prefix), then text.
pub fn infer_field_type(value: &Value) -> FieldType {
    if is_numeric_like(value) {
        FieldType::Numeric
    } else if is_boolean_like(value) {
        FieldType::Boolean
    } else if value.as_str().is_some_and(has_date_prefix) {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

fn is_numeric_like(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(f64::is_finite)
            .unwrap_or(false),
        _ => false,
    }
}

fn is_boolean_like(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

fn has_date_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// Deterministic GUID for a reconstructed field
pub fn synthetic_guid(application_id: i64, level_id: i64, alias: &str) -> String {
    let digest = md5::compute(format!("{application_id}:{level_id}:{alias}"));
    let hex = format!("{:x}", digest);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::clock::epoch;
    use crate::testkit::fixtures::record;
    use serde_json::json;

    fn level() -> LevelMapping {
        LevelMapping {
            level_id: 42,
            name: "Risk".to_string(),
            alias: "Risk_Register".to_string(),
            module_name: "Risk Register".to_string(),
            module_id: 75,
        }
    }

    #[test]
    fn test_infer_field_type_precedence() {
        assert_eq!(infer_field_type(&json!(12.5)), FieldType::Numeric);
        assert_eq!(infer_field_type(&json!("42")), FieldType::Numeric);
        assert_eq!(infer_field_type(&json!(true)), FieldType::Boolean);
        assert_eq!(infer_field_type(&json!("FALSE")), FieldType::Boolean);
        assert_eq!(infer_field_type(&json!("2024-05-01T10:00:00Z")), FieldType::Date);
        assert_eq!(infer_field_type(&json!("2024-05-01")), FieldType::Date);
        assert_eq!(infer_field_type(&json!("05/01/2024")), FieldType::Text);
        assert_eq!(infer_field_type(&json!("inf")), FieldType::Text);
        assert_eq!(infer_field_type(&json!(["a"])), FieldType::Text);
    }

    #[test]
    fn test_system_keys_are_skipped() {
        assert!(is_system_key("__odata_etag"));
        assert!(is_system_key("odata.metadata"));
        assert!(is_system_key("Id"));
        assert!(is_system_key("LevelId"));
        assert!(!is_system_key("Risk_Id"));
        assert!(!is_system_key("Title"));
    }

    #[test]
    fn test_extract_from_sample_records() {
        let records = vec![
            record(json!({
                "Id": 1, "LevelId": 42, "__metadata": {},
                "Risk_Id": "R-1", "Score": null, "Title": "Flood"
            })),
            record(json!({"Score": 7, "Review_Date": "2024-06-30T00:00:00", "Title": "Fire"})),
        ];

        let fields = FieldExtractor::extract_from_sample_records(&records, 75, &level(), epoch());
        let aliases: Vec<&str> = fields.iter().map(|f| f.alias.as_str()).collect();

        // serde_json maps iterate in key order within one record
        assert_eq!(aliases.len(), 4);
        assert!(aliases.contains(&"Risk_Id"));
        assert!(!aliases.contains(&"Id"));

        let score = fields.iter().find(|f| f.alias == "Score").unwrap();
        assert_eq!(score.field_type, FieldType::Numeric);

        let review = fields.iter().find(|f| f.alias == "Review_Date").unwrap();
        assert_eq!(review.field_type, FieldType::Date);

        let key = fields.iter().find(|f| f.alias == "Risk_Id").unwrap();
        assert!(key.is_key);
        assert_eq!(key.field_type, FieldType::Text);

        let mut ids: Vec<i64> = fields.iter().map(|f| f.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1001, 1002, 1003, 1004]);
        assert!(fields.iter().all(|f| f.level_id == 42 && f.is_active));
    }

    #[test]
    fn test_synthetic_guid_is_stable() {
        let guid = synthetic_guid(75, 42, "Score");
        assert_eq!(guid, synthetic_guid(75, 42, "Score"));
        assert_ne!(guid, synthetic_guid(75, 43, "Score"));

        let groups: Vec<usize> = guid.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
    }
}

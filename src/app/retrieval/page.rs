//! Retrieval results

use serde::Serialize;
use serde_json::json;

use crate::app::models::{ApplicationInfo, Record};

/// Total record count reported with a page
///
/// The ContentAPI has no count endpoint, so totals are either the size of a
/// sample or a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TotalCount {
    /// Number of records in the sample that served the page
    Sampled(usize),
    /// Lower-bound estimate
    Approximate(usize),
}

impl TotalCount {
    pub fn value(&self) -> usize {
        match self {
            Self::Sampled(n) | Self::Approximate(n) => *n,
        }
    }

    pub fn is_exact_sample(&self) -> bool {
        matches!(self, Self::Sampled(_))
    }
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// One-based page number
    pub page_number: usize,
    pub page_size: usize,
    pub total_count: TotalCount,
}

/// Why a batched retrieval stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// A batch came back short, so every record was read
    Exhausted,
    /// The soft deadline passed between batches
    TimeBudget,
    /// The requested maximum was reached
    MaxRecords,
    /// A batch timed out
    Timeout,
    /// A batch failed and its retry failed too
    NetworkError,
}

impl StopReason {
    /// Whether the records may be incomplete
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Exhausted | Self::MaxRecords)
    }
}

/// Records gathered by a batched retrieval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub records: Vec<Record>,
    /// Requests issued, retries included
    pub batches: usize,
    pub stop_reason: StopReason,
}

/// Placeholder record returned when an application has no ContentAPI endpoint
pub fn synthetic_record(application: &ApplicationInfo) -> Record {
    let record = json!({
        "Id": application.id,
        "Name": application.name,
        "Status": application.status_label(),
        "Note": "No ContentAPI endpoint could be resolved for this application; \
                 records are unavailable",
    });
    match record {
        serde_json::Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::ApplicationKind;

    #[test]
    fn test_synthetic_record() {
        let application = ApplicationInfo {
            id: 75,
            name: "Risk Register".to_string(),
            alias: None,
            status: Some(1),
            kind: ApplicationKind::Application,
            raw: serde_json::Value::Null,
        };

        let record = synthetic_record(&application);
        assert_eq!(record.get("Id"), Some(&json!(75)));
        assert_eq!(record.get("Status"), Some(&json!("Active")));
        assert!(record.contains_key("Note"));
    }

    #[test]
    fn test_stop_reasons() {
        assert!(!StopReason::Exhausted.is_partial());
        assert!(StopReason::Timeout.is_partial());
        assert_eq!(TotalCount::Approximate(120).value(), 120);
        assert!(TotalCount::Sampled(3).is_exact_sample());
    }
}

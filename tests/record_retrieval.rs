//! Integration tests for endpoint resolution, field inference and record paging

mod common;

use archer_fetcher::app::client::Method;
use archer_fetcher::app::metadata::LevelResolver;
use archer_fetcher::app::models::{FieldType, LevelMapping};
use archer_fetcher::app::retrieval::{StopReason, TotalCount};
use archer_fetcher::app::RecordQuery;
use archer_fetcher::testkit::clock::epoch;
use archer_fetcher::testkit::fixtures;
use archer_fetcher::testkit::transport::Scripted;
use common::Harness;
use serde_json::json;

fn risk_register(harness: &Harness) {
    harness.applications(vec![fixtures::application(75, "Risk Register")]);
    harness.module(
        75,
        fixtures::level(42, "Risk", "Risk_Register", 75),
        42,
        vec![fixtures::field(1, "Title", "Title", 1)],
    );
}

/// Serve `total` numbered records honouring `$top` and `$skip`
fn serve_records(harness: &Harness, path: &str, total: usize) {
    harness.transport.handle(Method::Get, path, move |request| {
        let top = request
            .query_value("$top")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(total);
        let skip = request
            .query_value("$skip")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let count = top.min(total.saturating_sub(skip));
        Scripted::ok(fixtures::odata(fixtures::records(skip + 1, count)))
    });
}

#[tokio::test]
async fn test_risk_register_first_page_has_sampled_total() {
    let harness = Harness::with_defaults();
    risk_register(&harness);
    serve_records(&harness, "/contentapi/Risk_Register", 340);

    let set = harness
        .service
        .get_records(
            &fixtures::connection(),
            "Risk Register",
            RecordQuery::Page { page: 1, size: 100 },
            false,
        )
        .await
        .unwrap();

    assert_eq!(set.endpoint.as_deref(), Some("/contentapi/Risk_Register"));
    assert_eq!(set.records.len(), 100);
    assert_eq!(set.page_number, Some(1));
    assert_eq!(set.total_count, TotalCount::Sampled(340));
    assert_eq!(set.records[0].get("Title"), Some(&json!("Record 1")));
}

#[tokio::test]
async fn test_2500_records_are_read_in_three_batches() {
    let harness = Harness::with_defaults();
    risk_register(&harness);
    serve_records(&harness, "/contentapi/Risk_Register", 2500);

    let set = harness
        .service
        .get_records(
            &fixtures::connection(),
            "Risk Register",
            RecordQuery::Paginated { max: None },
            true,
        )
        .await
        .unwrap();

    assert_eq!(set.records.len(), 2500);
    assert_eq!(set.stop_reason, Some(StopReason::Exhausted));

    let batches: Vec<(Option<String>, Option<String>)> = harness
        .transport
        .requests()
        .iter()
        .filter(|request| request.path == "/contentapi/Risk_Register")
        .map(|request| {
            (
                request.query_value("$top").map(str::to_string),
                request.query_value("$skip").map(str::to_string),
            )
        })
        .collect();
    assert_eq!(
        batches,
        vec![
            (Some("1000".to_string()), None),
            (Some("1000".to_string()), Some("1000".to_string())),
            (Some("1000".to_string()), Some("2000".to_string())),
        ]
    );
}

#[test]
fn test_exact_level_match_beats_substring() {
    let level = |id: i64, alias: &str, module_name: &str| LevelMapping {
        level_id: id,
        name: module_name.to_string(),
        alias: alias.to_string(),
        module_name: module_name.to_string(),
        module_id: id,
    };
    let resolver = LevelResolver::new(vec![
        level(1, "Risk_Register_Archive", "Risk Register Archive"),
        level(2, "Risk_Register", "Risk Register"),
    ]);

    let found = resolver.find_level_mapping("risk register").unwrap();
    assert_eq!(found.level_id, 2);
    assert_eq!(found.content_path(), "/contentapi/Risk_Register");

    let partial = resolver.find_level_mapping("Archive").unwrap();
    assert_eq!(partial.level_id, 1);
}

#[tokio::test]
async fn test_fields_are_inferred_when_definitions_are_empty() {
    let harness = Harness::with_defaults();
    harness.applications(vec![fixtures::application(75, "Risk Register")]);
    harness.module(
        75,
        fixtures::level(42, "Risk", "Risk_Register", 75),
        42,
        vec![],
    );
    let samples: Vec<_> = (1..=5)
        .map(|n| {
            json!({
                "Id": n,
                "Risk_ID": format!("R-{n}"),
                "Score": n * 10,
                "Identified_On": "2024-02-01T00:00:00",
                "Owner": "Ops"
            })
        })
        .collect();
    harness.transport.get_with_query(
        "/contentapi/Risk_Register",
        &[("$top", "5")],
        Scripted::ok(fixtures::odata(samples)),
    );

    let entry = harness
        .service
        .get_fields(&fixtures::connection(), "Risk Register")
        .await
        .unwrap();

    let field = |alias: &str| {
        entry
            .fields
            .iter()
            .find(|field| field.alias == alias)
            .unwrap_or_else(|| panic!("missing inferred field {alias}"))
    };
    assert_eq!(entry.fields.len(), 4);
    assert!(entry.fields.iter().all(|field| field.level_id == 42));
    assert!(entry.fields.iter().all(|field| field.id > 1000));

    assert_eq!(field("Score").field_type, FieldType::Numeric);
    assert_eq!(field("Identified_On").field_type, FieldType::Date);
    assert_eq!(field("Owner").field_type, FieldType::Text);
    assert!(field("Risk_ID").is_key);
    assert!(!field("Owner").is_key);
}

#[tokio::test]
async fn test_records_pass_through_when_no_fields_are_known() {
    let harness = Harness::with_defaults();
    harness.applications(vec![fixtures::application(75, "Risk Register")]);
    harness.transport.get_json(
        &common::levels_path(75),
        fixtures::wrapped(vec![fixtures::level(42, "Risk", "Risk_Register", 75)]),
    );
    harness.transport.handle(Method::Get, &common::fields_path(42), |_| {
        Scripted::status(500, json!(null))
    });
    harness
        .transport
        .handle(Method::Get, "/contentapi/Risk_Register", |request| {
            match request.query_value("$top") {
                Some("1000") => Scripted::ok(fixtures::odata(vec![
                    json!({"Risk_Title": "Flood", "Score": 9}),
                ])),
                _ => Scripted::status(500, json!(null)),
            }
        });

    let set = harness
        .service
        .get_records(
            &fixtures::connection(),
            "Risk Register",
            RecordQuery::Paginated { max: None },
            false,
        )
        .await
        .unwrap();

    assert_eq!(set.records.len(), 1);
    assert_eq!(set.records[0], fixtures::record(json!({"Risk_Title": "Flood", "Score": 9})));

    // Retried after a minute rather than the full application TTL
    let entry = harness.service.cache().peek(75).await.unwrap();
    assert!(entry.fields.is_empty());
    assert_eq!(
        entry.cache_expires_at,
        epoch() + chrono::Duration::seconds(60)
    );

    harness.clock.advance_seconds(61);
    harness
        .service
        .get_fields(&fixtures::connection(), "Risk Register")
        .await
        .unwrap();
    assert_eq!(harness.level_fetches(75), 2);
}

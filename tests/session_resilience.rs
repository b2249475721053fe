//! Integration tests for login cooldowns and session pooling

mod common;

use archer_fetcher::constants::endpoints;
use archer_fetcher::errors::{AppError, AuthError};
use archer_fetcher::testkit::fixtures;
use archer_fetcher::testkit::transport::Scripted;
use common::Harness;
use tokio_test::{assert_err, assert_ok};

fn rejecting_harness() -> Harness {
    let harness = Harness::with_defaults();
    harness.transport.clear_routes();
    harness.transport.post(
        endpoints::LOGIN,
        Scripted::ok(fixtures::login_rejected(&["Invalid credentials"])),
    );
    harness
}

#[tokio::test]
async fn test_cooldown_grows_with_each_failure() {
    let harness = rejecting_harness();
    let connection = fixtures::connection();

    let mut cooldowns = Vec::new();
    for _ in 0..3 {
        let error = harness.service.connect(&connection).await.unwrap_err();
        assert!(matches!(error, AppError::Auth(AuthError::LoginRejected { .. })));

        let status = harness.service.auth_status(&connection).await;
        let minutes = status.cooldown_remaining_minutes.unwrap();
        cooldowns.push(minutes);

        // Wait out the cooldown so the next attempt reaches the server
        harness.clock.advance_minutes(minutes);
        harness.clock.advance_seconds(1);
    }
    assert_eq!(cooldowns, vec![5, 10, 15]);
    assert_eq!(harness.transport.count_for(endpoints::LOGIN), 3);

    // A fourth failure inside the 20 minute window
    assert_err!(harness.service.connect(&connection).await);
    let calls_before = harness.transport.call_count();

    let error = harness.service.connect(&connection).await.unwrap_err();
    match error {
        AppError::Auth(AuthError::CooldownActive {
            remaining_minutes,
            failures,
        }) => {
            assert_eq!(remaining_minutes, 20);
            assert_eq!(failures, 4);
        }
        other => panic!("expected cooldown, got {:?}", other),
    }
    assert_eq!(harness.transport.call_count(), calls_before);
}

#[tokio::test]
async fn test_attempt_during_cooldown_makes_no_request() {
    let harness = rejecting_harness();
    let connection = fixtures::connection();

    harness.service.connect(&connection).await.unwrap_err();
    harness.clock.advance_minutes(4);

    let calls_before = harness.transport.call_count();
    let error = harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AppError::Auth(AuthError::CooldownActive {
            remaining_minutes: 1,
            failures: 1
        })
    ));
    assert_eq!(harness.transport.call_count(), calls_before);
}

#[tokio::test]
async fn test_success_resets_failures() {
    let harness = rejecting_harness();
    let connection = fixtures::connection();

    harness.service.connect(&connection).await.unwrap_err();
    assert_eq!(harness.service.auth_status(&connection).await.failure_count, 1);

    harness.clock.advance_minutes(6);
    harness.transport.clear_routes();
    harness
        .transport
        .post(endpoints::LOGIN, Scripted::ok(fixtures::login_ok("TOKEN-2")));
    let client = harness.service.connect(&connection).await.unwrap();

    assert_eq!(client.session_token().await.as_deref(), Some("TOKEN-2"));
    let status = harness.service.auth_status(&connection).await;
    assert_eq!(status.failure_count, 0);
    assert!(status.cooldown_remaining_minutes.is_none());
    assert!(status.has_valid_session);
}

#[tokio::test]
async fn test_sessions_are_pooled_per_user() {
    let harness = Harness::with_defaults();
    let analyst = fixtures::connection();
    let auditor = fixtures::connection_for("auditor");

    let first = harness.service.connect(&analyst).await.unwrap();
    let again = harness.service.connect(&analyst).await.unwrap();
    let other = harness.service.connect(&auditor).await.unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert!(!std::sync::Arc::ptr_eq(&first, &other));
    assert_eq!(harness.transport.count_for(endpoints::LOGIN), 2);
    assert_eq!(harness.service.sessions().pooled_count().await, 2);
}

#[tokio::test]
async fn test_expired_lease_triggers_relogin() {
    let harness = Harness::with_defaults();
    let connection = fixtures::connection();

    assert_ok!(harness.service.connect(&connection).await);
    harness.clock.advance_minutes(19);
    assert_ok!(harness.service.connect(&connection).await);
    assert_eq!(harness.transport.count_for(endpoints::LOGIN), 1);

    harness.clock.advance_minutes(2);
    assert_ok!(harness.service.connect(&connection).await);
    assert_eq!(harness.transport.count_for(endpoints::LOGIN), 2);
}

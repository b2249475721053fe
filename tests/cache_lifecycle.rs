//! Integration tests for metadata cache expiry, background refresh and eviction

mod common;

use std::time::Duration;

use archer_fetcher::app::cache::{CacheConfig, CacheState};
use archer_fetcher::app::client::{ArcherResponse, Method};
use archer_fetcher::testkit::clock::epoch;
use archer_fetcher::testkit::fixtures;
use archer_fetcher::testkit::transport::Scripted;
use common::{fields_path, levels_path, Harness};
use futures::future::join_all;

fn risk_register(harness: &Harness) {
    harness.applications(vec![fixtures::application(75, "Risk Register")]);
    harness.module(
        75,
        fixtures::level(42, "Risk", "Risk_Register", 75),
        42,
        vec![fixtures::field(1, "Risk Title", "Risk_Title", 1)],
    );
}

#[tokio::test]
async fn test_entry_is_served_until_ttl_then_refetched() {
    let config = CacheConfig::default()
        .with_application_ttl(Duration::from_secs(30 * 60))
        .with_auto_refresh_threshold(0.9999);
    let harness = Harness::new(config);
    risk_register(&harness);
    let connection = fixtures::connection();

    harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();
    assert_eq!(harness.level_fetches(75), 1);

    // Just before expiry the cached entry is authoritative
    harness.clock.advance_seconds(30 * 60 - 1);
    let entry = harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();
    assert_eq!(entry.last_updated, epoch());
    assert_eq!(harness.level_fetches(75), 1);

    // Just after expiry the caller waits for a fresh fetch
    harness.clock.advance_seconds(2);
    let entry = harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();
    assert_eq!(harness.level_fetches(75), 2);
    assert!(entry.last_updated > epoch());
    assert_eq!(harness.service.cache().state(75).await, CacheState::Fresh);
    assert_eq!(harness.service.cache_stats().await.expirations, 1);
}

#[tokio::test]
async fn test_stale_reads_start_exactly_one_background_refresh() {
    let harness = Harness::with_defaults();
    risk_register(&harness);
    let connection = fixtures::connection();

    harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();

    // 25 of 30 minutes: inside the 20% auto-refresh window
    harness.clock.advance_minutes(25);
    assert_eq!(
        harness.service.cache().state(75).await,
        CacheState::StaleApproaching
    );

    let (first, second, third) = tokio::join!(
        harness.service.get_fields(&connection, "Risk Register"),
        harness.service.get_fields(&connection, "Risk Register"),
        harness.service.get_fields(&connection, "Risk Register"),
    );
    assert_eq!(first.unwrap().last_updated, epoch());
    assert!(second.is_ok());
    assert!(third.is_ok());

    harness.service.cache().drain_background_refreshes().await;

    assert_eq!(harness.level_fetches(75), 2);
    let stats = harness.service.cache_stats().await;
    assert_eq!(stats.background_refreshes, 1);
    assert_eq!(stats.misses, 1);

    let refreshed = harness.service.cache().peek(75).await.unwrap();
    assert!(refreshed.last_updated > epoch());
}

#[tokio::test]
async fn test_least_recently_updated_entry_is_evicted() {
    let harness = Harness::new(CacheConfig::default().with_max_entries(2));
    harness.applications(vec![
        fixtures::application(1, "Alpha"),
        fixtures::application(2, "Bravo"),
        fixtures::application(3, "Charlie"),
    ]);
    for (id, alias) in [(1, "Alpha"), (2, "Bravo"), (3, "Charlie")] {
        harness.module(
            id,
            fixtures::level(id * 10, alias, alias, id),
            id * 10,
            vec![fixtures::field(id * 100, "Title", "Title", 1)],
        );
    }
    let connection = fixtures::connection();
    let cache = harness.service.cache();

    for name in ["Alpha", "Bravo", "Charlie"] {
        harness.service.get_fields(&connection, name).await.unwrap();
        harness.clock.advance_minutes(1);
    }

    assert!(cache.peek(1).await.is_none());
    assert!(cache.peek(2).await.is_some());
    assert!(cache.peek(3).await.is_some());
    assert!(cache.get_translation_mapping(1).await.is_none());

    let stats = harness.service.cache_stats().await;
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.evictions, 1);
}

#[tokio::test]
async fn test_invalidated_entry_is_refetched() {
    let harness = Harness::with_defaults();
    risk_register(&harness);
    let connection = fixtures::connection();

    harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();
    assert!(harness.service.invalidate_application(75).await);
    assert!(!harness.service.invalidate_application(75).await);
    assert_eq!(harness.service.cache().state(75).await, CacheState::Absent);

    harness
        .service
        .get_fields(&connection, "Risk Register")
        .await
        .unwrap();
    assert_eq!(harness.level_fetches(75), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_share_one_level_fetch() {
    let harness = Harness::with_defaults();
    harness.applications(vec![fixtures::application(75, "Risk Register")]);
    harness.transport.push(
        Method::Get,
        &levels_path(75),
        &[],
        Scripted::Delayed(
            Duration::from_millis(100),
            ArcherResponse::new(
                200,
                fixtures::wrapped(vec![fixtures::level(42, "Risk", "Risk_Register", 75)]),
            ),
        ),
    );
    harness.transport.get_json(
        &fields_path(42),
        fixtures::wrapped(vec![fixtures::field(1, "Risk Title", "Risk_Title", 1)]),
    );
    let connection = fixtures::connection();

    let reads = join_all(
        (0..8).map(|_| harness.service.get_fields(&connection, "Risk Register")),
    )
    .await;

    let generations: Vec<u64> = reads
        .into_iter()
        .map(|entry| entry.unwrap().generation)
        .collect();
    assert_eq!(harness.level_fetches(75), 1);
    assert!(generations.iter().all(|g| *g == generations[0]));

    // After expiry the same burst refetches exactly once more
    harness.clock.advance_seconds(30 * 60 + 1);
    let reads = join_all(
        (0..8).map(|_| harness.service.get_fields(&connection, "Risk Register")),
    )
    .await;
    assert!(reads.iter().all(Result::is_ok));
    assert_eq!(harness.level_fetches(75), 2);
}

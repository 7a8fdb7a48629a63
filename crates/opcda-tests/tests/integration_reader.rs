// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Reader Integration Tests
//!
//! Acquisition cycles through the public reader API against the mock
//! data source:
//!
//! - `test_group_*`: configured group reads
//! - `test_tags_*`: ad-hoc tag reads and the handle cache
//! - `test_input_*`: payload handling and validation

use std::time::Duration;

use opcda_client::{CycleOutcome, ReporterEvent, SkipReason, TagHandlePolicy};
use opcda_core::{ConnectionState, DaError, DaValue, ItemId, NodeStatus, QualityBand, StatusCode};
use opcda_tests::prelude::*;

// =============================================================================
// Group Reads
// =============================================================================

#[tokio::test]
async fn test_group_read_all_good() {
    init_test_logging();
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.mock.set_value("Tag1", DaValue::Int(10), 200);
    harness.mock.set_value("Tag2", DaValue::Int(20), 200);
    harness.start_ready().await;

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&outcome, NodeStatus::GoodQuality).expect("output expected");

    assert_eq!(item_ids(output), vec!["Tag1", "Tag2"]);
    output.payload[0].assert_reading("Tag1", &DaValue::Int(10));
    output.payload[1].assert_reading("Tag2", &DaValue::Int(20));
    output.payload[1].assert_band(QualityBand::Good);

    let events = harness.drain();
    assert_eq!(
        events,
        vec![
            ReporterEvent::Status(NodeStatus::Reading),
            ReporterEvent::Status(NodeStatus::GoodQuality),
            ReporterEvent::Output(output.clone()),
        ]
    );
}

#[tokio::test]
async fn test_group_read_emit_on_change() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags_on_change());
    harness.mock.set_value("Tag1", DaValue::Int(10), 200);
    harness.mock.set_value("Tag2", DaValue::Int(20), 200);
    harness.start_ready().await;

    // The first cycle has nothing to compare against.
    let first = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&first, NodeStatus::GoodQuality).unwrap();
    assert_eq!(item_ids(output), vec!["Tag1", "Tag2"]);

    harness.mock.set_value("Tag2", DaValue::Int(25), 200);
    let second = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&second, NodeStatus::GoodQuality).unwrap();
    assert_eq!(item_ids(output), vec!["Tag2"]);
    output.payload[0].assert_reading("Tag2", &DaValue::Int(25));

    // Nothing changed: status is still reported, no output.
    harness.drain();
    let third = harness.reader.handle_payload("{}").await.unwrap();
    assert!(assert_completed(&third, NodeStatus::GoodQuality).is_none());
    assert_eq!(
        harness.statuses(),
        vec![NodeStatus::Reading, NodeStatus::GoodQuality]
    );
}

#[tokio::test]
async fn test_group_read_mismatch() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;
    harness.mock.truncate_next_read(1);

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&outcome, NodeStatus::Mismatch).unwrap();
    assert_eq!(output.len(), 1);
}

#[tokio::test]
async fn test_group_read_bad_quality_wins_over_mismatch() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.mock.set_value("Tag1", DaValue::Int(1), 0);
    harness.start_ready().await;
    harness.mock.truncate_next_read(1);

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&outcome, NodeStatus::BadQuality).unwrap();
    output.payload[0].assert_band(QualityBand::Bad);
}

#[tokio::test]
async fn test_group_read_without_items() {
    let mut harness = ReaderHarness::new(ReaderFixtures::group(&[]));
    harness.start_ready().await;

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    assert!(assert_completed(&outcome, NodeStatus::NoItem).is_none());
    assert_eq!(harness.mock.read_calls(), 0);
    assert_eq!(
        harness.statuses(),
        vec![NodeStatus::Reading, NodeStatus::NoItem]
    );
}

#[tokio::test]
async fn test_group_read_skips_rejected_item() {
    let mock = std::sync::Arc::new(MockDataSource::new());
    mock.reject_item("Tag2", StatusCode::UNKNOWN_ITEM_ID);
    let mut harness =
        ReaderHarness::with_mock(mock, ServerFixtures::settings(), ReaderFixtures::two_tags());
    harness.start_ready().await;

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&outcome, NodeStatus::Mismatch).unwrap();
    assert_eq!(item_ids(output), vec!["Tag1"]);
}

#[tokio::test(start_paused = true)]
async fn test_group_reads_are_mutually_exclusive() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;
    harness.mock.set_read_delay(Duration::from_millis(200));

    let (first, second) = tokio::join!(
        harness.reader.handle_payload("{}"),
        harness.reader.handle_payload("{}")
    );

    assert!(matches!(first.unwrap(), CycleOutcome::Completed { .. }));
    assert_eq!(second.unwrap(), CycleOutcome::Skipped(SkipReason::Busy));
    assert_eq!(harness.mock.read_calls(), 1);
    assert_eq!(harness.reader.stats().skipped, 1);
    assert!(!harness.reader.engine().is_reading());
}

#[tokio::test(start_paused = true)]
async fn test_tag_read_skipped_while_group_read_in_flight() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;
    harness.mock.set_read_delay(Duration::from_millis(200));
    let adds_before = harness.mock.add_items_calls();

    let (group, tags) = tokio::join!(
        harness.reader.handle_payload("{}"),
        harness.reader.handle_payload(r#"{"tags": ["Extra"]}"#)
    );

    assert!(matches!(group.unwrap(), CycleOutcome::Completed { .. }));
    assert_eq!(tags.unwrap(), CycleOutcome::Skipped(SkipReason::Busy));
    assert_eq!(harness.mock.add_items_calls(), adds_before);
    assert_eq!(harness.mock.times_added(&ItemId::new("Extra")), 0);
    assert_eq!(harness.mock.read_calls(), 1);
    assert_eq!(harness.reader.stats().skipped, 1);
}

#[tokio::test]
async fn test_group_read_before_start_is_skipped() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Skipped(SkipReason::NotReady(ConnectionState::Disconnected))
    );
    assert_eq!(harness.mock.read_calls(), 0);
}

#[tokio::test]
async fn test_group_read_uses_cached_handles() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;

    for _ in 0..3 {
        harness.reader.handle_payload("{}").await.unwrap();
    }

    assert_eq!(harness.mock.add_items_calls(), 1);
    assert_eq!(harness.mock.times_added(&ItemId::new("Tag1")), 1);
    assert_eq!(harness.mock.read_calls(), 3);
    assert_eq!(harness.reader.stats().cycles, 3);
}

// =============================================================================
// Tag Reads
// =============================================================================

#[tokio::test]
async fn test_tags_read_in_request_order() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.mock.set_value("A", DaValue::Float(1.5), 192);
    harness.mock.set_value("B", DaValue::from("text"), 192);
    harness.start_ready().await;

    let outcome = harness
        .reader
        .handle_payload(r#"{"tags": ["B", "A"]}"#)
        .await
        .unwrap();
    let output = assert_completed(&outcome, NodeStatus::GoodQuality).unwrap();

    assert_eq!(item_ids(output), vec!["B", "A"]);
    output.payload[0].assert_reading("B", &DaValue::from("text"));
    output.payload[1].assert_reading("A", &DaValue::Float(1.5));
    // One read call per tag.
    assert_eq!(harness.mock.read_calls(), 2);
}

#[tokio::test]
async fn test_tags_cached_handles_are_reused() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.start_ready().await;
    let tags = tags(&["A", "B"]);

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    harness.reader.engine().read_tags(&tags, true).await.unwrap();

    assert_eq!(harness.mock.add_items_calls(), 1);
    assert_eq!(harness.mock.remove_calls(), 0);
    let cache = harness.reader.connection().handles();
    assert!(cache.contains(&ItemId::new("A")));
    assert!(cache.contains(&ItemId::new("B")));
}

#[tokio::test]
async fn test_tags_transient_handles_are_removed() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Transient));
    harness.start_ready().await;
    let tags = tags(&["A"]);

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    assert_eq!(harness.mock.remove_calls(), 1);
    assert_eq!(harness.mock.removed_handles().len(), 1);
    assert!(harness.reader.connection().handles().is_empty());

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    assert_eq!(harness.mock.times_added(&ItemId::new("A")), 2);
    assert_eq!(harness.mock.live_handles(), 0);
}

#[tokio::test]
async fn test_tags_transient_keeps_configured_items() {
    let config = opcda_client::ReaderConfig {
        tag_policy: TagHandlePolicy::Transient,
        ..ReaderFixtures::two_tags()
    };
    let mut harness = ReaderHarness::new(config);
    harness.start_ready().await;

    harness
        .reader
        .engine()
        .read_tags(&tags(&["Tag1", "Extra"]), false)
        .await
        .unwrap();

    let cache = harness.reader.connection().handles();
    assert!(cache.contains(&ItemId::new("Tag1")));
    assert!(!cache.contains(&ItemId::new("Extra")));
    assert_eq!(harness.mock.removed_handles().len(), 1);
}

#[tokio::test]
async fn test_tags_rejected_tag_is_omitted() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.mock.reject_item("Missing", StatusCode::UNKNOWN_ITEM_ID);
    harness.start_ready().await;

    let outcome = harness
        .reader
        .engine()
        .read_tags(&tags(&["A", "Missing"]), false)
        .await
        .unwrap();
    let output = assert_completed(&outcome, NodeStatus::Mismatch).unwrap();

    assert_eq!(item_ids(output), vec!["A"]);
    assert!(!harness
        .reader
        .connection()
        .handles()
        .contains(&ItemId::new("Missing")));
}

#[tokio::test(start_paused = true)]
async fn test_tags_read_failure_invalidates_and_reconnects() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.start_ready().await;
    let tags = tags(&["A", "B"]);

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    assert_eq!(harness.reader.connection().handles().len(), 2);

    harness.mock.fail_reads_for("B");
    let err = harness
        .reader
        .handle_input(opcda_client::ReadRequest::Tags(tags.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, DaError::Read(_)));
    assert_eq!(err.status_code(), Some(StatusCode::UNKNOWN_ITEM_ID));

    let cache = harness.reader.connection().handles();
    assert!(!cache.contains(&ItemId::new("A")));
    assert!(!cache.contains(&ItemId::new("B")));
    assert_ne!(harness.reader.state(), ConnectionState::Ready);
    assert!(harness.statuses().contains(&NodeStatus::Error));
    assert_eq!(harness.reader.stats().read_errors, 1);

    harness.mock.clear_read_failures_for(&ItemId::new("B"));
    harness.wait_for_state(ConnectionState::Ready).await;

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    assert_eq!(harness.mock.times_added(&ItemId::new("B")), 2);
}

#[tokio::test]
async fn test_tags_empty_list_reports_no_item() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.start_ready().await;

    let outcome = harness.reader.handle_payload(r#"{"tags": []}"#).await.unwrap();
    assert_completed(&outcome, NodeStatus::NoItem);
    assert_eq!(harness.mock.add_items_calls(), 0);
}

// =============================================================================
// Input Handling
// =============================================================================

#[tokio::test]
async fn test_input_validation_has_no_side_effects() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.start_ready().await;

    for payload in [r#"{"tags": ["A", ""]}"#, r#"{"tags": ["A", 1]}"#, "{not json"] {
        let err = harness.reader.handle_payload(payload).await.unwrap_err();
        assert!(matches!(err, DaError::Validation(_)), "{payload}: {err}");
    }

    assert!(harness.drain().is_empty());
    assert_eq!(harness.reader.state(), ConnectionState::Ready);
    assert_eq!(harness.mock.add_items_calls(), 0);
    assert_eq!(harness.mock.read_calls(), 0);
    assert_eq!(harness.reader.stats().rejected_inputs, 3);
}

#[tokio::test]
async fn test_input_non_tag_payload_reads_group() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;

    for payload in ["", "42", r#"{"tags": "Tag1"}"#, r#"{"other": true}"#] {
        let outcome = harness.reader.handle_payload(payload).await.unwrap();
        let output = assert_completed(&outcome, NodeStatus::GoodQuality).unwrap();
        assert_eq!(item_ids(output), vec!["Tag1", "Tag2"], "{payload}");
    }
}

#[tokio::test]
async fn test_input_output_serializes_readings() {
    let mut harness = ReaderHarness::new(ReaderFixtures::group(&["Tag1"]));
    harness.mock.set_value("Tag1", DaValue::Int(7), 64);
    harness.start_ready().await;

    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    let output = assert_completed(&outcome, NodeStatus::BadQuality).unwrap();
    let json = serde_json::to_value(output).unwrap();

    let reading = &json["payload"][0];
    assert_eq!(reading["itemID"], "Tag1");
    assert_eq!(reading["value"], 7);
    assert_eq!(reading["qualityBand"], "UNCERTAIN");
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Connection Lifecycle Integration Tests
//!
//! Connect, timeout, reconnect and shutdown behavior. All tests run on a
//! paused clock so reconnect delays elapse instantly.

use std::time::Duration;

use opcda_client::client::RemoteResource;
use opcda_client::{CycleOutcome, ReconnectOutcome, SkipReason, TagHandlePolicy};
use opcda_core::{ConnectError, ConnectionState, ItemId, NodeStatus, RemoteError, StatusCode};
use opcda_tests::prelude::*;

// =============================================================================
// Connect
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_reports_connecting_then_ready() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());

    harness.reader.start().await.unwrap();

    assert_eq!(harness.reader.state(), ConnectionState::Ready);
    assert_eq!(
        harness.statuses(),
        vec![NodeStatus::Connecting, NodeStatus::Ready]
    );
    assert_eq!(harness.mock.live_sessions(), 1);
    assert_eq!(harness.reader.connection().handles().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_twice_is_a_no_op() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.reader.start().await.unwrap();

    harness.reader.connection().connect().await.unwrap();

    assert_eq!(harness.mock.create_session_calls(), 1);
    assert_eq!(harness.reader.stats().connection.connects, 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_releases_partial_session() {
    let mut harness = ReaderHarness::with_settings(
        ServerFixtures::with_timeout(Duration::from_secs(5)),
        ReaderFixtures::two_tags(),
    );
    harness.mock.delay_next_connect(Duration::from_secs(10));

    let err = harness.reader.connection().connect().await.unwrap_err();

    assert!(err.is_timeout());
    assert!(err.is_retryable());
    assert_eq!(err.to_string(), "Connection Timeout after 5s");
    assert_eq!(
        harness.statuses(),
        vec![NodeStatus::Connecting, NodeStatus::Timeout]
    );
    assert_eq!(harness.reader.state(), ConnectionState::Disconnected);
    assert_eq!(harness.mock.live_sessions(), 0);
    assert!(harness
        .mock
        .teardown_log()
        .iter()
        .any(|r| matches!(r, RemoteResource::Session(_))));
    assert_eq!(harness.reader.stats().connection.timeouts, 1);

    // Only the first connect was delayed.
    let outcome = harness.reader.connection().request_reconnect().await.unwrap();
    assert_eq!(outcome, ReconnectOutcome::Connected { attempts: 1 });
    assert_eq!(harness.mock.connect_calls(), 2);
    assert_eq!(harness.reader.state(), ConnectionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_start_recovers_from_timeout() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.mock.delay_next_connect(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    harness.reader.start().await.unwrap();
    harness.wait_for_state(ConnectionState::Ready).await;

    assert!(started.elapsed() >= ServerFixtures::TIMEOUT + ReaderFixtures::RECONNECT_DELAY);
    let statuses = harness.statuses();
    assert_eq!(
        statuses,
        vec![
            NodeStatus::Connecting,
            NodeStatus::Timeout,
            NodeStatus::Connecting,
            NodeStatus::Ready,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_fatal_error_stops() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness
        .mock
        .fail_next_connect(RemoteError::status(StatusCode::ACCESS_DENIED));

    let err = harness.reader.start().await.unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.code(), Some(StatusCode::ACCESS_DENIED));
    assert_eq!(harness.reader.state(), ConnectionState::Fatal);
    assert_eq!(
        harness.statuses(),
        vec![NodeStatus::Connecting, NodeStatus::Error]
    );

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.mock.connect_calls(), 1);
    assert_eq!(harness.mock.live_sessions(), 0);

    // Fatal is sticky.
    let outcome = harness.reader.connection().request_reconnect().await.unwrap();
    assert_eq!(outcome, ReconnectOutcome::Stopped);
    harness.reader.connection().disconnect().await;
    assert_eq!(harness.reader.state(), ConnectionState::Fatal);

    let cycle = harness.reader.handle_payload("{}").await.unwrap();
    assert_eq!(
        cycle,
        CycleOutcome::Skipped(SkipReason::NotReady(ConnectionState::Fatal))
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_fatal_clsid_errors() {
    for code in [StatusCode::INVALID_CLSID_SYNTAX, StatusCode::CLSID_NOT_FOUND] {
        let harness = ReaderHarness::new(ReaderFixtures::two_tags());
        harness.mock.fail_next_connect(RemoteError::status(code));

        let err = harness.reader.start().await.unwrap_err();
        assert_eq!(err, ConnectError::Rejected { code });
        assert!(harness.reader.state().is_fatal());
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_retryable_error_recovers() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness
        .mock
        .fail_next_connect(RemoteError::transport("RPC server unavailable"));
    harness
        .mock
        .fail_next_connect(RemoteError::status(StatusCode::NOT_FOUND));

    harness.reader.start().await.unwrap();
    harness.wait_for_state(ConnectionState::Ready).await;

    let stats = harness.reader.stats().connection;
    assert_eq!(harness.mock.connect_calls(), 3);
    assert_eq!(stats.connect_attempts, 3);
    assert_eq!(stats.connect_failures, 2);
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.reconnect_attempts, 2);
    // Every failed attempt released its session.
    assert_eq!(harness.mock.live_sessions(), 1);
}

// =============================================================================
// Reconnect
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_group_read_failure_reconnects() {
    let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.start_ready().await;
    harness
        .mock
        .fail_next_read(RemoteError::transport("connection reset"));

    assert!(harness.reader.handle_payload("{}").await.is_err());
    assert_eq!(
        harness.reader.handle_payload("{}").await.unwrap(),
        CycleOutcome::Skipped(SkipReason::NotReady(ConnectionState::Reconnecting))
    );

    harness.wait_for_status(NodeStatus::Ready).await;
    let outcome = harness.reader.handle_payload("{}").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed { .. }));
    assert_eq!(harness.mock.create_session_calls(), 2);
    assert_eq!(harness.reader.stats().read_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_drop_reconnects_with_fresh_handles() {
    let mut harness = ReaderHarness::new(ReaderFixtures::ad_hoc(TagHandlePolicy::Cached));
    harness.start_ready().await;
    let tags = tags(&["A"]);

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    let first_handles = harness.mock.read_handles();

    harness.mock.drop_session();
    harness.wait_for_status(NodeStatus::Disconnected).await;
    harness.wait_for_status(NodeStatus::Ready).await;

    // Ad-hoc handles belonged to the dropped session.
    assert!(!harness.reader.connection().handles().contains(&ItemId::new("A")));

    harness.reader.engine().read_tags(&tags, false).await.unwrap();
    let latest = *harness.mock.read_handles().last().unwrap();
    assert!(!first_handles.contains(&latest));
    assert_eq!(harness.mock.times_added(&ItemId::new("A")), 2);
    assert_eq!(harness.reader.stats().connection.session_drops, 1);
}

#[tokio::test(start_paused = true)]
async fn test_only_one_reconnect_loop_runs() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.reader.start().await.unwrap();

    let first = harness.reader.connection().request_reconnect();
    let second = harness.reader.connection().request_reconnect();
    let outcomes = [first.await.unwrap(), second.await.unwrap()];

    assert!(outcomes.contains(&ReconnectOutcome::Connected { attempts: 1 }));
    assert!(outcomes.contains(&ReconnectOutcome::AlreadyRunning));
    assert_eq!(harness.mock.create_session_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_keeps_trying() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    for _ in 0..5 {
        harness
            .mock
            .fail_next_connect(RemoteError::transport("host unreachable"));
    }

    harness.reader.start().await.unwrap();
    harness.wait_for_state(ConnectionState::Ready).await;

    assert_eq!(harness.mock.connect_calls(), 6);
    assert_eq!(harness.reader.stats().connection.reconnect_attempts, 5);
}

// =============================================================================
// Disconnect & Shutdown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_releases_in_order_and_is_idempotent() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.reader.start().await.unwrap();

    harness.reader.connection().disconnect().await;
    let log = harness.mock.teardown_log();
    assert_eq!(log.len(), 5);
    assert!(matches!(log[0], RemoteResource::SyncIo(_)));
    assert!(matches!(log[1], RemoteResource::ItemManager(_)));
    assert!(matches!(log[2], RemoteResource::Group(_)));
    assert!(matches!(log[3], RemoteResource::Server(_)));
    assert!(matches!(log[4], RemoteResource::Session(_)));
    assert!(harness.reader.connection().handles().is_empty());

    harness.reader.connection().disconnect().await;
    assert_eq!(harness.mock.teardown_log().len(), 5);
    assert_eq!(harness.reader.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_reconnect_delay() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.reader.start().await.unwrap();

    let reconnect = harness.reader.connection().request_reconnect();
    tokio::time::sleep(ReaderFixtures::RECONNECT_DELAY / 2).await;
    assert_eq!(harness.reader.state(), ConnectionState::Reconnecting);
    // Torn down before the next connect repopulates it.
    assert!(harness.reader.connection().handles().is_empty());
    assert_eq!(harness.mock.live_sessions(), 0);

    harness.reader.shutdown().await;

    assert_eq!(reconnect.await.unwrap(), ReconnectOutcome::Cancelled);
    assert_eq!(harness.reader.state(), ConnectionState::Disconnected);
    assert_eq!(harness.mock.create_session_calls(), 1);
    assert_eq!(harness.mock.live_sessions(), 0);

    // A shut down reader never connects again.
    assert_eq!(
        harness.reader.connection().connect().await.unwrap_err(),
        ConnectError::Cancelled
    );
    harness.reader.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_connect() {
    let harness = ReaderHarness::new(ReaderFixtures::two_tags());
    harness.mock.delay_next_connect(Duration::from_secs(3));

    let (started, ()) = tokio::join!(harness.reader.start(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        harness.reader.shutdown().await;
    });

    assert_eq!(started.unwrap_err(), ConnectError::Cancelled);
    assert_eq!(harness.reader.state(), ConnectionState::Disconnected);
    assert_eq!(harness.mock.live_sessions(), 0);
}

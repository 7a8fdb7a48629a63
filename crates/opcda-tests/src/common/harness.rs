// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Wires a reader to a [`MockDataSource`] and a channel reporter, and
//! collects what the reader reports.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use opcda_client::{
    ChannelReporter, OpcDaReader, OutputMessage, ReaderConfig, ReporterEvent, ServerSettings,
};
use opcda_core::{ConnectionState, NodeStatus};

use crate::common::fixtures::ServerFixtures;
use crate::common::mocks::MockDataSource;

/// Upper bound for any wait in the harness.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// A reader on a mock data source with its reporter channel.
pub struct ReaderHarness {
    /// The mock behind the reader.
    pub mock: Arc<MockDataSource>,
    /// The reader under test.
    pub reader: OpcDaReader<MockDataSource>,
    events: UnboundedReceiver<ReporterEvent>,
}

impl ReaderHarness {
    /// Creates a harness with the fixture server settings.
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_settings(ServerFixtures::settings(), config)
    }

    /// Creates a harness with custom server settings.
    pub fn with_settings(settings: ServerSettings, config: ReaderConfig) -> Self {
        Self::with_mock(Arc::new(MockDataSource::new()), settings, config)
    }

    /// Creates a harness around an existing mock.
    pub fn with_mock(
        mock: Arc<MockDataSource>,
        settings: ServerSettings,
        config: ReaderConfig,
    ) -> Self {
        let (reporter, events) = ChannelReporter::new();
        let reader = OpcDaReader::new(Arc::clone(&mock), settings, config, Arc::new(reporter))
            .expect("harness settings must be valid");
        Self {
            mock,
            reader,
            events,
        }
    }

    /// Starts the reader and waits until it is ready.
    pub async fn start_ready(&mut self) {
        self.reader.start().await.expect("start failed");
        self.wait_for_state(ConnectionState::Ready).await;
        self.drain();
    }

    /// Waits until the connection reaches `state`.
    pub async fn wait_for_state(&self, state: ConnectionState) {
        let mut rx = self.reader.subscribe_state();
        tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|s| *s == state))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {:?}", state))
            .expect("state channel closed");
    }

    /// Takes every event reported so far.
    pub fn drain(&mut self) -> Vec<ReporterEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Takes every status reported so far.
    pub fn statuses(&mut self) -> Vec<NodeStatus> {
        self.drain()
            .into_iter()
            .filter_map(|e| match e {
                ReporterEvent::Status(s) => Some(s),
                ReporterEvent::Output(_) => None,
            })
            .collect()
    }

    /// Splits the events reported so far into statuses and outputs.
    pub fn collect(&mut self) -> (Vec<NodeStatus>, Vec<OutputMessage>) {
        let mut statuses = Vec::new();
        let mut outputs = Vec::new();
        for event in self.drain() {
            match event {
                ReporterEvent::Status(s) => statuses.push(s),
                ReporterEvent::Output(o) => outputs.push(o),
            }
        }
        (statuses, outputs)
    }

    /// Waits for the next reported status equal to `status`.
    pub async fn wait_for_status(&mut self, status: NodeStatus) {
        let wait = async {
            while let Some(event) = self.events.recv().await {
                if event == ReporterEvent::Status(status) {
                    return;
                }
            }
            panic!("reporter channel closed");
        };
        tokio::time::timeout(WAIT_TIMEOUT, wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for status {}", status));
    }
}

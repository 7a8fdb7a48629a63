// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reader facade.
//!
//! [`OpcDaReader`] is one managed connection plus its acquisition engine.
//! Hosts create one per configured server, call [`start`](OpcDaReader::start)
//! once, feed it input events and call [`shutdown`](OpcDaReader::shutdown)
//! when done.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opcda_client::{OpcDaReader, ReadRequest, SimulatedDataSource, TracingReporter};
//!
//! let reader = OpcDaReader::new(
//!     Arc::new(SimulatedDataSource::new()),
//!     settings,
//!     config,
//!     Arc::new(TracingReporter),
//! )?;
//! reader.start().await?;
//! reader.handle_payload(r#"{"tags": ["Random.Int4"]}"#).await?;
//! reader.shutdown().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use opcda_core::{ConfigurationError, ConnectError, ConnectionState, DaError, DaResult};

use crate::acquisition::{AcquisitionEngine, CycleOutcome};
use crate::client::connection::{ConnectionManager, ConnectionStatsSnapshot};
use crate::client::transport::RemoteDataSource;
use crate::reporter::StatusReporter;
use crate::request::ReadRequest;
use crate::types::{ReaderConfig, ServerSettings};

// =============================================================================
// ReaderStats
// =============================================================================

/// Reader counters.
#[derive(Debug, Default)]
pub struct ReaderStats {
    cycles: AtomicU64,
    skipped: AtomicU64,
    read_errors: AtomicU64,
    rejected_inputs: AtomicU64,
}

impl ReaderStats {
    fn record(&self, result: &DaResult<CycleOutcome>) {
        let counter = match result {
            Ok(CycleOutcome::Completed { .. }) => &self.cycles,
            Ok(CycleOutcome::Skipped(_)) => &self.skipped,
            Err(DaError::Validation(_)) => &self.rejected_inputs,
            Err(_) => &self.read_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of the counters.
    pub fn snapshot(&self) -> ReaderStatsSnapshot {
        ReaderStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            rejected_inputs: self.rejected_inputs.load(Ordering::Relaxed),
            connection: ConnectionStatsSnapshot::default(),
        }
    }
}

/// Point-in-time copy of [`ReaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStatsSnapshot {
    /// Completed acquisition cycles.
    pub cycles: u64,
    /// Input events skipped because a cycle was in flight or the connection
    /// was not ready.
    pub skipped: u64,
    /// Cycles that ended in a read error.
    pub read_errors: u64,
    /// Input events rejected by validation.
    pub rejected_inputs: u64,
    /// Connection counters, including reconnect attempts.
    pub connection: ConnectionStatsSnapshot,
}

// =============================================================================
// OpcDaReader
// =============================================================================

/// One OPC DA reader instance.
pub struct OpcDaReader<S: RemoteDataSource> {
    connection: Arc<ConnectionManager<S>>,
    engine: AcquisitionEngine<S>,
    stats: ReaderStats,
}

impl<S: RemoteDataSource> OpcDaReader<S> {
    /// Creates a reader.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for a missing server, missing
    /// credentials or an invalid field. Nothing is retried in that case.
    pub fn new(
        source: Arc<S>,
        settings: ServerSettings,
        config: ReaderConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Self, ConfigurationError> {
        let connection =
            ConnectionManager::new(source, settings, config, reporter).map_err(|err| {
                warn!(error = %err, "Reader misconfigured");
                err
            })?;
        Ok(Self {
            engine: AcquisitionEngine::new(Arc::clone(&connection)),
            connection,
            stats: ReaderStats::default(),
        })
    }

    /// Runs the first connect.
    ///
    /// A retryable failure hands over to the reconnect loop and returns
    /// `Ok`; the reader becomes ready in the background.
    ///
    /// # Errors
    ///
    /// Returns the error of a fatal failure. The state is then `Fatal`.
    pub async fn start(&self) -> Result<(), ConnectError> {
        info!(
            address = %self.connection.settings().address,
            group = %self.connection.config().group_name,
            items = self.connection.config().items.len(),
            "Starting OPC DA reader"
        );
        match self.connection.connect().await {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err),
            Err(ConnectError::Cancelled) => Err(ConnectError::Cancelled),
            Err(_) => {
                self.connection.request_reconnect();
                Ok(())
            }
        }
    }

    /// Runs the acquisition an input event asks for.
    ///
    /// Group reads use the configured cache setting.
    pub async fn handle_input(&self, request: ReadRequest) -> DaResult<CycleOutcome> {
        let use_cache = self.connection.config().use_cache;
        let result = match &request {
            ReadRequest::Group => self.engine.read_group(use_cache).await,
            ReadRequest::Tags(tags) => self.engine.read_tags(tags, use_cache).await,
        };
        self.stats.record(&result);
        result
    }

    /// Parses a JSON payload and runs the acquisition it asks for.
    pub async fn handle_payload(&self, payload: &str) -> DaResult<CycleOutcome> {
        match ReadRequest::parse(payload) {
            Ok(request) => self.handle_input(request).await,
            Err(err) => {
                let err = DaError::from(err);
                err.log("input");
                self.stats.rejected_inputs.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Stops reconnecting and disconnects. Idempotent.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Subscribes to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    /// Returns the connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager<S>> {
        &self.connection
    }

    /// Returns the acquisition engine.
    pub fn engine(&self) -> &AcquisitionEngine<S> {
        &self.engine
    }

    /// Returns reader and connection counters.
    pub fn stats(&self) -> ReaderStatsSnapshot {
        ReaderStatsSnapshot {
            connection: self.connection.stats().snapshot(),
            ..self.stats.snapshot()
        }
    }
}

impl<S: RemoteDataSource> std::fmt::Debug for OpcDaReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcDaReader")
            .field("connection", &self.connection)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

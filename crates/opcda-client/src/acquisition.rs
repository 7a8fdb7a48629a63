// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Acquisition cycles.
//!
//! [`AcquisitionEngine`] runs the two kinds of cycles against the session
//! owned by a [`ConnectionManager`]:
//!
//! - [`read_group`](AcquisitionEngine::read_group) reads every configured
//!   item in one batched call and tracks value changes per position
//! - [`read_tags`](AcquisitionEngine::read_tags) resolves ad-hoc tags
//!   through the handle cache and reads them in parallel
//!
//! Only one cycle runs at a time. A cycle triggered while another is in
//! flight is skipped without any remote call. A failed read never recovers
//! inline; it reports `error` and hands over to the reconnect loop.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use opcda_core::{
    ClassifiedReading, ConnectionState, DaError, DaResult, DaValue, DataSource, ItemId,
    NodeStatus, ReadError, ServerHandle, ValidationError,
};

use crate::client::connection::ConnectionManager;
use crate::client::transport::RemoteDataSource;
use crate::reporter::{OutputMessage, StatusReporter};
use crate::types::TagHandlePolicy;

// =============================================================================
// Outcomes
// =============================================================================

/// Why a cycle did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle is in flight.
    Busy,
    /// The connection is not ready.
    NotReady(ConnectionState),
}

/// Result of one acquisition trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The cycle ran.
    Completed {
        /// Aggregate status of the cycle.
        status: NodeStatus,
        /// What was emitted, if anything.
        output: Option<OutputMessage>,
    },
    /// The cycle did not run.
    Skipped(SkipReason),
}

impl CycleOutcome {
    /// Returns the aggregate status of a completed cycle.
    pub fn status(&self) -> Option<NodeStatus> {
        match self {
            Self::Completed { status, .. } => Some(*status),
            Self::Skipped(_) => None,
        }
    }

    /// Returns the emitted output of a completed cycle.
    pub fn output(&self) -> Option<&OutputMessage> {
        match self {
            Self::Completed { output, .. } => output.as_ref(),
            Self::Skipped(_) => None,
        }
    }

    /// Returns `true` if the cycle was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Derives the status of a cycle.
///
/// No configured item wins over everything, then any non-GOOD reading, then
/// a count that differs from the expected one.
pub fn aggregate_status(expected: usize, readings: &[ClassifiedReading]) -> NodeStatus {
    if expected == 0 {
        NodeStatus::NoItem
    } else if !readings.iter().all(ClassifiedReading::is_good) {
        NodeStatus::BadQuality
    } else if readings.len() != expected {
        NodeStatus::Mismatch
    } else {
        NodeStatus::GoodQuality
    }
}

/// Rejects blank tags.
pub fn validate_tags(tags: &[ItemId]) -> Result<(), ValidationError> {
    match tags.iter().position(ItemId::is_blank) {
        Some(index) => Err(ValidationError::EmptyTag { index }),
        None => Ok(()),
    }
}

// =============================================================================
// AcquisitionEngine
// =============================================================================

#[derive(Debug, Default)]
struct CycleState {
    previous: Vec<Option<DaValue>>,
}

impl CycleState {
    /// Records `readings` and returns which positions changed.
    fn track(&mut self, readings: &[ClassifiedReading]) -> Vec<bool> {
        let changed = readings
            .iter()
            .enumerate()
            .map(|(i, reading)| {
                self.previous.get(i).and_then(Option::as_ref) != Some(&reading.value)
            })
            .collect();
        self.previous = readings.iter().map(|r| Some(r.value.clone())).collect();
        changed
    }
}

/// Runs acquisition cycles for one connection.
pub struct AcquisitionEngine<S: RemoteDataSource> {
    connection: Arc<ConnectionManager<S>>,
    cycle: Mutex<CycleState>,
}

impl<S: RemoteDataSource> AcquisitionEngine<S> {
    /// Creates an engine on top of `connection`.
    pub fn new(connection: Arc<ConnectionManager<S>>) -> Self {
        Self {
            connection,
            cycle: Mutex::new(CycleState::default()),
        }
    }

    /// Returns the connection.
    pub fn connection(&self) -> &Arc<ConnectionManager<S>> {
        &self.connection
    }

    fn reporter(&self) -> &Arc<dyn StatusReporter> {
        self.connection.reporter()
    }

    /// Returns `true` while a cycle is in flight.
    pub fn is_reading(&self) -> bool {
        self.cycle.try_lock().is_err()
    }

    /// Reads the configured group.
    ///
    /// `use_cache` selects the server cache over the device. Returns
    /// [`CycleOutcome::Skipped`] without a remote call while another cycle
    /// runs or the connection is not ready.
    ///
    /// # Errors
    ///
    /// Returns [`DaError::Read`] when the batched read fails. A reconnect has
    /// been requested by then.
    pub async fn read_group(&self, use_cache: bool) -> DaResult<CycleOutcome> {
        let Ok(mut cycle) = self.cycle.try_lock() else {
            trace!("Group read skipped, cycle in flight");
            return Ok(CycleOutcome::Skipped(SkipReason::Busy));
        };
        let state = self.connection.state();
        if !state.is_ready() {
            return Ok(CycleOutcome::Skipped(SkipReason::NotReady(state)));
        }
        let guard = self.connection.session().await;
        let Some(active) = *guard else {
            return Ok(CycleOutcome::Skipped(SkipReason::NotReady(
                self.connection.state(),
            )));
        };

        self.reporter().report_status(NodeStatus::Reading);
        let config = self.connection.config();
        let expected = config.items.len();
        if expected == 0 {
            self.reporter().report_status(NodeStatus::NoItem);
            return Ok(CycleOutcome::Completed {
                status: NodeStatus::NoItem,
                output: None,
            });
        }

        let handles: Vec<ServerHandle> = config
            .items
            .iter()
            .filter_map(|item| self.connection.handles().lookup(item))
            .collect();

        let results = if handles.is_empty() {
            Vec::new()
        } else {
            let source = DataSource::from_use_cache(use_cache);
            match self
                .connection
                .source()
                .read(active.group, source, &handles)
                .await
            {
                Ok(results) => results,
                Err(err) => {
                    drop(guard);
                    return Err(self.fail_cycle(ReadError::from(err).into()));
                }
            }
        };
        drop(guard);

        let readings: Vec<ClassifiedReading> =
            results.into_iter().map(|r| r.classify()).collect();
        let changed = cycle.track(&readings);
        let status = aggregate_status(expected, &readings);
        debug!(
            group = %config.group_name,
            expected,
            received = readings.len(),
            status = %status,
            "Group read completed"
        );
        self.reporter().report_status(status);

        let payload: Vec<ClassifiedReading> = if config.emit_on_change {
            readings
                .into_iter()
                .zip(changed)
                .filter_map(|(reading, changed)| changed.then_some(reading))
                .collect()
        } else {
            readings
        };

        let output = (!payload.is_empty()).then(|| OutputMessage::new(payload));
        if let Some(message) = &output {
            self.reporter().emit(message.clone());
        }
        Ok(CycleOutcome::Completed { status, output })
    }

    /// Reads ad-hoc tags.
    ///
    /// Tags not cached yet are added first. Tags the server rejects are
    /// logged and left out of the output. The remaining tags are read one
    /// call per handle, concurrently, and returned in input order.
    ///
    /// # Errors
    ///
    /// Returns [`DaError::Validation`] for a blank tag, before anything else
    /// happens. Returns [`DaError::Read`] when the add call or any read
    /// fails; the involved tags are dropped from the cache and a reconnect
    /// has been requested.
    pub async fn read_tags(&self, tags: &[ItemId], use_cache: bool) -> DaResult<CycleOutcome> {
        validate_tags(tags)?;

        let Ok(_cycle) = self.cycle.try_lock() else {
            trace!("Tag read skipped, cycle in flight");
            return Ok(CycleOutcome::Skipped(SkipReason::Busy));
        };
        let state = self.connection.state();
        if !state.is_ready() {
            return Ok(CycleOutcome::Skipped(SkipReason::NotReady(state)));
        }
        let guard = self.connection.session().await;
        let Some(active) = *guard else {
            return Ok(CycleOutcome::Skipped(SkipReason::NotReady(
                self.connection.state(),
            )));
        };

        self.reporter().report_status(NodeStatus::Reading);
        if tags.is_empty() {
            self.reporter().report_status(NodeStatus::NoItem);
            return Ok(CycleOutcome::Completed {
                status: NodeStatus::NoItem,
                output: None,
            });
        }

        let cache = self.connection.handles();
        let source = self.connection.source();
        let resolutions = match cache.ensure(source, active.group, tags).await {
            Ok(resolutions) => resolutions,
            Err(err) => {
                drop(guard);
                self.invalidate_all(tags);
                return Err(self.fail_cycle(ReadError::from(err).into()));
            }
        };

        let mut resolved: Vec<(&ItemId, ServerHandle)> = Vec::with_capacity(tags.len());
        let mut added: Vec<ServerHandle> = Vec::new();
        for resolution in &resolutions {
            match &resolution.outcome {
                Ok(handle) => {
                    resolved.push((&resolution.item, *handle));
                    if resolution.newly_added && !added.contains(handle) {
                        added.push(*handle);
                    }
                }
                Err(err) => warn!(
                    item = %err.item,
                    code = %err.code,
                    description = err.description().unwrap_or_default(),
                    "{err}"
                ),
            }
        }

        let data_source = DataSource::from_use_cache(use_cache);
        let reads = join_all(resolved.iter().map(|(_, handle)| {
            source.read(active.group, data_source, std::slice::from_ref(handle))
        }))
        .await;

        let mut readings = Vec::with_capacity(resolved.len());
        let mut failure = None;
        for ((item, _), result) in resolved.iter().zip(reads) {
            match result {
                Ok(results) => readings.extend(results.into_iter().map(|r| r.classify())),
                Err(err) => {
                    cache.invalidate(item);
                    warn!(item = %item, error = %err, "Tag read failed");
                    failure.get_or_insert(err);
                }
            }
        }

        if let Some(err) = failure {
            drop(guard);
            self.invalidate_all(tags);
            return Err(self.fail_cycle(ReadError::from(err).into()));
        }

        if self.connection.config().tag_policy == TagHandlePolicy::Transient && !added.is_empty() {
            if let Err(err) = source.remove_items(active.group, &added).await {
                warn!(error = %err, handles = added.len(), "Failed to remove transient items");
            }
            for resolution in resolutions.iter().filter(|r| r.newly_added) {
                cache.invalidate(&resolution.item);
            }
        }
        drop(guard);

        let status = aggregate_status(tags.len(), &readings);
        debug!(
            requested = tags.len(),
            received = readings.len(),
            status = %status,
            "Tag read completed"
        );
        self.reporter().report_status(status);

        let message = OutputMessage::new(readings);
        self.reporter().emit(message.clone());
        Ok(CycleOutcome::Completed {
            status,
            output: Some(message),
        })
    }

    fn invalidate_all(&self, tags: &[ItemId]) {
        for tag in tags {
            self.connection.handles().invalidate(tag);
        }
    }

    fn fail_cycle(&self, err: DaError) -> DaError {
        err.log("acquisition");
        self.reporter().report_status(NodeStatus::Error);
        self.connection.request_reconnect();
        err
    }
}

impl<S: RemoteDataSource> std::fmt::Debug for AcquisitionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionEngine")
            .field("connection", &self.connection)
            .field("reading", &self.is_reading())
            .finish()
    }
}

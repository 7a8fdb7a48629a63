// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Status and output sinks.
//!
//! The reader never talks to its host directly. Status transitions and
//! output messages go to a [`StatusReporter`]:
//!
//! - [`ChannelReporter`] forwards both into an unbounded channel
//! - [`TracingReporter`] logs them

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use opcda_core::{ClassifiedReading, NodeStatus};

/// Output of one acquisition cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    /// Readings in request order.
    pub payload: Vec<ClassifiedReading>,
}

impl OutputMessage {
    /// Creates a message.
    pub fn new(payload: Vec<ClassifiedReading>) -> Self {
        Self { payload }
    }

    /// Number of readings.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if there are no readings.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Receives status transitions and output messages.
pub trait StatusReporter: Send + Sync {
    /// Called on every status transition.
    fn report_status(&self, status: NodeStatus);

    /// Called once per cycle that yields output.
    fn emit(&self, message: OutputMessage);
}

/// Something a [`ChannelReporter`] forwarded.
#[derive(Debug, Clone, PartialEq)]
pub enum ReporterEvent {
    /// A status transition.
    Status(NodeStatus),
    /// An output message.
    Output(OutputMessage),
}

/// Forwards everything into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ReporterEvent>,
}

impl ChannelReporter {
    /// Creates a reporter and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReporterEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusReporter for ChannelReporter {
    fn report_status(&self, status: NodeStatus) {
        if self.tx.send(ReporterEvent::Status(status)).is_err() {
            debug!(status = %status, "Status receiver dropped");
        }
    }

    fn emit(&self, message: OutputMessage) {
        if self.tx.send(ReporterEvent::Output(message)).is_err() {
            debug!("Output receiver dropped");
        }
    }
}

/// Logs status transitions and output sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report_status(&self, status: NodeStatus) {
        info!(status = %status, label = status.label(), "Status changed");
    }

    fn emit(&self, message: OutputMessage) {
        debug!(readings = message.len(), "Output emitted");
    }
}

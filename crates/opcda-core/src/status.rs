// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Status signals and connection states.
//!
//! [`NodeStatus`] is what an operator sees: a short signal emitted on every
//! lifecycle or acquisition transition. [`ConnectionState`] is the internal
//! state of the connection state machine:
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Ready
//!                      ▲            │ failure
//!                      │            ▼
//!                      └────── Reconnecting
//!
//! any state ──▶ Fatal (unrecoverable status code)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// NodeStatus
// =============================================================================

/// Status signal reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The session dropped or was torn down.
    Disconnected,
    /// Connecting took longer than the configured timeout.
    Timeout,
    /// A connect attempt is in flight.
    Connecting,
    /// A connect or read failed.
    Error,
    /// No items are configured.
    NoItem,
    /// At least one reading was not GOOD.
    BadQuality,
    /// Every reading was GOOD.
    GoodQuality,
    /// Connected and ready to acquire.
    Ready,
    /// An acquisition cycle started.
    Reading,
    /// The server returned a different number of values than requested.
    Mismatch,
}

/// Indicator colour of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    /// Failure.
    Red,
    /// Transitional or partial.
    Yellow,
    /// Connected.
    Green,
    /// Data flowing.
    Blue,
}

impl NodeStatus {
    /// All statuses.
    pub const ALL: [NodeStatus; 10] = [
        NodeStatus::Disconnected,
        NodeStatus::Timeout,
        NodeStatus::Connecting,
        NodeStatus::Error,
        NodeStatus::NoItem,
        NodeStatus::BadQuality,
        NodeStatus::GoodQuality,
        NodeStatus::Ready,
        NodeStatus::Reading,
        NodeStatus::Mismatch,
    ];

    /// Returns the machine name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Disconnected => "disconnected",
            NodeStatus::Timeout => "timeout",
            NodeStatus::Connecting => "connecting",
            NodeStatus::Error => "error",
            NodeStatus::NoItem => "no_item",
            NodeStatus::BadQuality => "bad_quality",
            NodeStatus::GoodQuality => "good_quality",
            NodeStatus::Ready => "ready",
            NodeStatus::Reading => "reading",
            NodeStatus::Mismatch => "mismatch",
        }
    }

    /// Returns the human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Disconnected => "Disconnected",
            NodeStatus::Timeout => "Timeout",
            NodeStatus::Connecting => "Connecting",
            NodeStatus::Error => "Error",
            NodeStatus::NoItem => "No Item",
            NodeStatus::BadQuality => "Bad Quality",
            NodeStatus::GoodQuality => "Good Quality",
            NodeStatus::Ready => "Ready",
            NodeStatus::Reading => "Reading",
            NodeStatus::Mismatch => "Mismatch Data",
        }
    }

    /// Returns the indicator colour.
    pub fn color(&self) -> StatusColor {
        match self {
            NodeStatus::Disconnected
            | NodeStatus::Timeout
            | NodeStatus::Error
            | NodeStatus::BadQuality => StatusColor::Red,
            NodeStatus::Connecting | NodeStatus::NoItem | NodeStatus::Mismatch => {
                StatusColor::Yellow
            }
            NodeStatus::Ready => StatusColor::Green,
            NodeStatus::GoodQuality | NodeStatus::Reading => StatusColor::Blue,
        }
    }

    /// Returns `true` for statuses that signal a failure.
    pub fn is_failure(&self) -> bool {
        self.color() == StatusColor::Red
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ConnectionState
// =============================================================================

/// State of a managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected,
    /// Establishing a session.
    Connecting,
    /// Session established and configured items added.
    Ready,
    /// Tearing down before the next connect attempt.
    Reconnecting,
    /// Stopped after an unrecoverable error.
    Fatal,
}

impl ConnectionState {
    /// Returns `true` if acquisitions may run.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Returns `true` if the state machine has stopped for good.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectionState::Fatal)
    }

    /// Returns `true` while a connect or reconnect is underway.
    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    /// Returns the machine name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the OPC DA reader.
//!
//! ```text
//! DaError
//! ├── Connect       - session establishment (timeout, rejected, transport)
//! ├── AddItem       - a single item could not be added to a group
//! ├── Read          - batch-level read failure
//! ├── Validation    - malformed caller input
//! ├── Configuration - construction-time misconfiguration
//! └── Remote        - raw failure reported by the transport
//! ```
//!
//! Retry policy is decided by status code: the codes in
//! [`StatusCode::FATAL`] stop the reconnect loop, everything else is retried.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::code::StatusCode;
use crate::types::ItemId;

/// Result type alias for reader operations.
pub type DaResult<T> = Result<T, DaError>;

// =============================================================================
// RemoteError
// =============================================================================

/// A failure reported by a remote data source call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server or DCOM layer returned a status code.
    #[error("remote status {0}")]
    Status(StatusCode),

    /// The call failed below the protocol (socket, RPC marshalling).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Creates a status error from a raw code.
    pub fn status(code: impl Into<StatusCode>) -> Self {
        Self::Status(code.into())
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns the status code, if any.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Transport(_) => None,
        }
    }

    /// Returns `true` if the code is in the fatal set.
    pub fn is_fatal(&self) -> bool {
        self.code().is_some_and(|c| c.is_fatal())
    }

    /// Returns the table description, or "Unknown error.".
    pub fn describe(&self) -> String {
        match self {
            Self::Status(code) => code.describe_or("Unknown error.").to_string(),
            Self::Transport(message) => message.clone(),
        }
    }
}

// =============================================================================
// ConnectError
// =============================================================================

/// Errors during connect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The connect sequence did not finish in time.
    #[error("Connection Timeout after {timeout:?}")]
    Timeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The server rejected a step of the connect sequence.
    #[error("connect rejected with {code}")]
    Rejected {
        /// Reported status code.
        code: StatusCode,
    },

    /// A step failed below the protocol.
    #[error("connect failed: {message}")]
    Transport {
        /// Transport message.
        message: String,
    },

    /// Shutdown interrupted the attempt.
    #[error("connect cancelled by shutdown")]
    Cancelled,
}

impl ConnectError {
    /// Creates a timeout error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Returns the status code of a rejection.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { code } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if the reconnect loop must stop.
    pub fn is_fatal(&self) -> bool {
        self.code().is_some_and(|c| c.is_fatal())
    }

    /// Returns `true` if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Rejected { code } => !code.is_fatal(),
            Self::Cancelled => false,
        }
    }

    /// Returns `true` for [`ConnectError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the description of the code, when known.
    pub fn description(&self) -> Option<&'static str> {
        self.code().and_then(|c| c.description())
    }
}

impl From<RemoteError> for ConnectError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Status(code) => Self::Rejected { code },
            RemoteError::Transport(message) => Self::Transport { message },
        }
    }
}

// =============================================================================
// AddItemError
// =============================================================================

/// An item could not be added to a group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error adding item '{item}', err_code: {code}")]
pub struct AddItemError {
    /// The rejected item.
    pub item: ItemId,
    /// Reported status code.
    pub code: StatusCode,
}

impl AddItemError {
    /// Creates a new add error.
    pub fn new(item: impl Into<ItemId>, code: impl Into<StatusCode>) -> Self {
        Self {
            item: item.into(),
            code: code.into(),
        }
    }

    /// Returns the description of the code, when known.
    pub fn description(&self) -> Option<&'static str> {
        self.code.description()
    }
}

// =============================================================================
// ReadError
// =============================================================================

/// Batch-level read failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The server rejected the read.
    #[error("read failed with {code}")]
    Remote {
        /// Reported status code.
        code: StatusCode,
    },

    /// The read failed below the protocol.
    #[error("read failed: {message}")]
    Transport {
        /// Transport message.
        message: String,
    },

    /// No session to read from.
    #[error("not connected")]
    NotConnected,
}

impl ReadError {
    /// Returns the status code, if any.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Remote { code } => Some(*code),
            _ => None,
        }
    }
}

impl From<RemoteError> for ReadError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Status(code) => Self::Remote { code },
            RemoteError::Transport(message) => Self::Transport { message },
        }
    }
}

// =============================================================================
// ValidationError
// =============================================================================

/// Malformed caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A tag is empty or whitespace.
    #[error("tag at index {index} is empty")]
    EmptyTag {
        /// Position in the tag list.
        index: usize,
    },

    /// A tag is not a string.
    #[error("tag at index {index} is not a string (found {found})")]
    NotAString {
        /// Position in the tag list.
        index: usize,
        /// JSON type that was found.
        found: &'static str,
    },

    /// The payload could not be interpreted.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// Parser message.
        message: String,
    },
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Construction-time misconfiguration. Reported once and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No server address configured.
    #[error("Please select a server.")]
    MissingServer,

    /// No credentials configured.
    #[error("Failed to load credentials!")]
    MissingCredentials,

    /// A field has an invalid value.
    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What is wrong.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// DaError
// =============================================================================

/// Top-level error of the reader.
#[derive(Debug, Error)]
pub enum DaError {
    /// Connect failure.
    #[error("{0}")]
    Connect(#[from] ConnectError),

    /// Item add failure.
    #[error("{0}")]
    AddItem(#[from] AddItemError),

    /// Read failure.
    #[error("{0}")]
    Read(#[from] ReadError),

    /// Caller input failure.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Misconfiguration.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Raw transport failure.
    #[error("{0}")]
    Remote(#[from] RemoteError),
}

impl DaError {
    /// Returns the status code carried by the error, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Connect(e) => e.code(),
            Self::AddItem(e) => Some(e.code),
            Self::Read(e) => e.code(),
            Self::Remote(e) => e.code(),
            Self::Validation(_) | Self::Configuration(_) => None,
        }
    }

    /// Returns `true` if the reconnect loop must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Configuration(_) => true,
            _ => self.status_code().is_some_and(|c| c.is_fatal()),
        }
    }

    /// Returns `true` if reconnecting may clear the error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(e) => e.is_retryable(),
            Self::Read(ReadError::NotConnected) => false,
            Self::Read(_) | Self::Remote(_) => !self.is_fatal(),
            Self::AddItem(_) | Self::Validation(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns the severity of the error.
    pub fn severity(&self) -> ErrorSeverity {
        if self.is_fatal() {
            return ErrorSeverity::Critical;
        }
        match self {
            Self::AddItem(_) | Self::Validation(_) => ErrorSeverity::Warning,
            Self::Connect(ConnectError::Cancelled) | Self::Read(ReadError::NotConnected) => {
                ErrorSeverity::Info
            }
            Self::Connect(e) if e.is_retryable() => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the category name used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::AddItem(_) => "add_item",
            Self::Read(_) => "read",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Remote(_) => "remote",
        }
    }

    /// Returns the table description of the status code, when known.
    pub fn description(&self) -> Option<&'static str> {
        self.status_code().and_then(|c| c.description())
    }

    /// Logs the error at a level matching its severity.
    pub fn log(&self, context: &str) {
        let code = self
            .status_code()
            .map(|c| c.to_string())
            .unwrap_or_default();
        let description = self.description().unwrap_or_default();

        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(
                category = self.category(),
                code = %code,
                description = description,
                context = context,
                fatal = self.is_fatal(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                category = self.category(),
                code = %code,
                description = description,
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, no action required.
    Info,
    /// Something was skipped.
    Warning,
    /// Recoverable failure.
    Error,
    /// Operator action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to a tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

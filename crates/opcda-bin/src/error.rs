// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process-level failures of the `opcda` command and their exit codes.

use thiserror::Error;

use opcda_core::{ConfigurationError, ConnectError, DaError};

/// Shorthand for results returned by commands.
pub type BinResult<T> = Result<T, BinError>;

/// Exit code for unusable configuration.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code when the process could not be set up.
pub const EXIT_STARTUP: i32 = 2;
/// Exit code for failures of the running pipeline.
pub const EXIT_PIPELINE: i32 = 3;
/// Exit code for stdin/stdout failures.
pub const EXIT_IO: i32 = 4;
/// Exit code for errors raised by the OPC DA reader.
pub const EXIT_READER: i32 = 5;

/// Anything that ends the `opcda` process with a non-zero status.
#[derive(Debug, Error)]
pub enum BinError {
    /// Settings were rejected before the reader was built.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The tokio runtime or logging could not be set up.
    #[error("startup failed: {0}")]
    Startup(String),

    /// The input/output pipeline failed while running.
    #[error("pipeline failed: {0}")]
    Pipeline(String),

    /// Reading stdin or writing stdout failed.
    #[error("stream failure: {0}")]
    Stream(String),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] opcda_config::ConfigError),

    /// The reader reported an error.
    #[error("reader: {0}")]
    Reader(#[from] DaError),

    /// Another error, prefixed with what was being done.
    #[error("{context}: {source}")]
    WithContext {
        /// What the process was doing.
        context: String,
        /// The wrapped failure.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Settings rejected before startup.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Process setup failure.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    /// Pipeline failure.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Stream failure.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Wraps `self` with a description of the failed step.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WithContext { source, .. } => source.exit_code(),
            Self::Settings(_) | Self::Config(_) | Self::Reader(DaError::Configuration(_)) => {
                EXIT_CONFIG
            }
            Self::Startup(_) => EXIT_STARTUP,
            Self::Pipeline(_) => EXIT_PIPELINE,
            Self::Stream(_) => EXIT_IO,
            Self::Reader(_) => EXIT_READER,
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::runtime(format!("{err:#}"))
    }
}

impl From<ConfigurationError> for BinError {
    fn from(err: ConfigurationError) -> Self {
        Self::Reader(DaError::from(err))
    }
}

impl From<ConnectError> for BinError {
    fn from(err: ConnectError) -> Self {
        Self::Reader(DaError::from(err))
    }
}

/// Prints `error` and its source chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("opcda: {error}");
    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        eprintln!("  because: {inner}");
        cause = inner.source();
    }
}

/// Prints `error` and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Failures while loading a reader configuration.

use std::path::PathBuf;
use thiserror::Error;

use opcda_core::ConfigurationError;

/// Shorthand for results of the loader.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file exists at the given path.
    #[error("configuration file {path} does not exist")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        #[source]
        #[allow(missing_docs)]
        source: std::io::Error,
    },

    /// The extension does not name YAML, TOML or JSON.
    #[error("no loader for '{format}' files (use .yaml, .toml or .json)")]
    UnsupportedFormat {
        /// The offending extension.
        format: String,
    },

    /// The file content is not valid for its format or schema.
    #[error("{path}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Deserializer message.
        message: String,
    },

    /// In-memory content that failed to deserialize.
    #[error("malformed configuration: {message}")]
    Syntax {
        /// Deserializer message.
        message: String,
    },

    /// An override variable held a value that cannot be used.
    #[error("${name} is not usable: {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// What was expected.
        message: String,
    },

    /// A section outside the server settings is out of range.
    #[error("{field} {message}")]
    Validation {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The server settings were rejected by the reader.
    #[error(transparent)]
    Settings(#[from] ConfigurationError),
}

impl ConfigError {
    /// See [`ConfigError::Parse`].
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// See [`ConfigError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// See [`ConfigError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// See [`ConfigError::FileNotFound`].
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// See [`ConfigError::InvalidEnvVar`].
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// See [`ConfigError::UnsupportedFormat`].
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// See [`ConfigError::Syntax`].
    pub fn syntax(message: impl ToString) -> Self {
        Self::Syntax {
            message: message.to_string(),
        }
    }

    /// Attaches `path` to a [`ConfigError::Syntax`] error.
    pub fn at(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Syntax { message } => Self::parse(path, message),
            other => other,
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcda-config
//!
//! Configuration management for the OPC DA reader.
//!
//! ## Features
//!
//! - **Multi-Format Support**: YAML, TOML and JSON configuration files
//! - **Placeholders**: `${VAR}` and `${VAR:default}` in any value
//! - **Environment Overrides**: `OPCDA_*` variables win over the file
//! - **Validation**: the same checks the reader runs at construction
//!
//! ## Quick Start
//!
//! ```no_run
//! use opcda_config::load_config;
//!
//! let config = load_config("opcda.yaml").unwrap();
//! println!("Server: {}", config.server.address);
//! println!("Items: {}", config.reader.items.len());
//! ```
//!
//! ## Example File
//!
//! ```yaml
//! server:
//!   address: "${OPC_HOST:127.0.0.1}"
//!   domain: PLANT
//!   username: operator
//!   password: "${OPC_PASSWORD}"
//!   clsid: F8582CF2-88FB-11D0-B850-00C0F0104305
//!   timeout: 5s
//! reader:
//!   group_name: line-1
//!   items: [Random.Int4, Random.Real8]
//!   use_cache: false
//!   emit_on_change: true
//!   reconnect_delay: 3s
//! runtime:
//!   poll_interval: 1s
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, resolve_env_placeholders, ConfigFormat, ConfigLoader};
pub use schema::{
    AppConfig, LogFormat, LogLevel, LoggingConfig, RuntimeConfig, SecretValue, ServerConfig,
    SimulatedItem, SimulatorConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

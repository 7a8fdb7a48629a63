// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcda-bin
//!
//! The `opcda` command. It loads a configuration, builds an
//! [`OpcDaReader`](opcda_client::OpcDaReader) on the configured data source
//! and wires it to the process:
//!
//! ```text
//! poll timer ──┐
//!              ├──► OpcDaReader ──► reporter ──► stdout (JSON lines)
//! stdin lines ─┘                        └──────► stderr (status log)
//! ```
//!
//! ```bash
//! opcda -c opcda.yaml
//! echo '{"tags": ["Random.Int4"]}' | opcda run
//! opcda validate --strict
//! opcda browse -f json
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{build_simulator, ReaderRuntime, RuntimeBuilder};
pub use shutdown::ShutdownCoordinator;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

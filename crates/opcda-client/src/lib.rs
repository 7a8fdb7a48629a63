// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcda-client
//!
//! Connection lifecycle and data acquisition for OPC DA servers.
//!
//! - **Client**: the `RemoteDataSource` capability, the handle cache, the
//!   connection state machine and an in-memory simulated server
//! - **Acquisition**: group and ad-hoc tag reads with quality aggregation
//!   and change detection
//! - **Reader**: the per-instance facade that turns input events into
//!   acquisitions
//! - **Reporter**: status and output sinks
//! - **Browse**: flat listing of a server's address space
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opcda_client::{
//!     OpcDaReader, ReaderConfig, ServerSettings, SimulatedDataSource, TracingReporter,
//! };
//!
//! let settings = ServerSettings::builder()
//!     .address("192.168.0.10")
//!     .credentials("operator", "secret")
//!     .clsid(SimulatedDataSource::CLSID)
//!     .build()?;
//! let config = ReaderConfig::builder()
//!     .items(["Random.Int4", "Random.Real8"])
//!     .build()?;
//!
//! let reader = OpcDaReader::new(
//!     Arc::new(SimulatedDataSource::new()),
//!     settings,
//!     config,
//!     Arc::new(TracingReporter),
//! )?;
//! reader.start().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod acquisition;
pub mod browse;
pub mod client;
pub mod reader;
pub mod reporter;
pub mod request;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use acquisition::{aggregate_status, AcquisitionEngine, CycleOutcome, SkipReason};
pub use browse::browse_items;
pub use client::{
    ConnectionManager, HandleCache, ReconnectOutcome, RemoteDataSource, SessionEvent,
    SimulatedDataSource,
};
pub use reader::{OpcDaReader, ReaderStats, ReaderStatsSnapshot};
pub use reporter::{ChannelReporter, OutputMessage, ReporterEvent, StatusReporter, TracingReporter};
pub use request::ReadRequest;
pub use types::{Credentials, ReaderConfig, ServerSettings, TagHandlePolicy};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

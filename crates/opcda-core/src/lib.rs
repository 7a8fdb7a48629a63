// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcda-core
//!
//! Core types shared by every crate of the OPC DA reader.
//!
//! - **Types**: `ItemId`, `ServerHandle`, `DaValue`, `ReadResult`, `ClassifiedReading`
//! - **Quality**: raw quality code classification into a `QualityBand`
//! - **Status**: `NodeStatus` signals and the `ConnectionState` machine states
//! - **StatusCode**: 32-bit remote status codes and their descriptions
//! - **Error**: the error taxonomy for connect, add, read and validation failures
//!
//! ## Example
//!
//! ```rust
//! use opcda_core::quality::{classify, QualityBand};
//! use opcda_core::StatusCode;
//!
//! assert_eq!(classify(192), QualityBand::Good);
//! assert!(StatusCode::ACCESS_DENIED.is_fatal());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod code;
pub mod error;
pub mod quality;
pub mod status;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use code::StatusCode;
pub use error::{
    AddItemError, ConfigurationError, ConnectError, DaError, DaResult, ErrorSeverity, ReadError,
    RemoteError, ValidationError,
};
pub use quality::{classify, QualityBand};
pub use status::{ConnectionState, NodeStatus, StatusColor};
pub use types::{ClassifiedReading, DaValue, DataSource, ItemId, ReadResult, ServerHandle};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

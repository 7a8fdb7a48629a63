// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC DA client plumbing.
//!
//! - **Transport**: the [`RemoteDataSource`] capability and its handle types
//! - **Handles**: the identifier-keyed [`HandleCache`]
//! - **Connection**: the [`ConnectionManager`] state machine
//! - **Simulated**: an in-memory [`SimulatedDataSource`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      AcquisitionEngine                          │
//! │               (read_group / read_tags cycles)                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ borrows session + handles
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ConnectionManager                           │
//! │        (connect, disconnect, reconnect loop, drop watch)        │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     RemoteDataSource                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod connection;
pub mod handles;
pub mod simulated;
pub mod transport;

pub use connection::{
    ActiveSession, ConnectionManager, ConnectionStats, ConnectionStatsSnapshot, ReconnectOutcome,
};
pub use handles::{CacheEntry, HandleCache, HandleResolution};
pub use simulated::SimulatedDataSource;
pub use transport::{
    AddItemOutcome, GroupHandle, RemoteDataSource, RemoteResource, ServerObjectHandle,
    SessionEvent, SessionHandle,
};

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Remote data source abstraction.
//!
//! [`RemoteDataSource`] is the seam between the reader and whatever performs
//! the DCOM calls against the OPC DA server. It allows:
//!
//! - Swapping the transport (real DCOM, simulator, test mock)
//! - Testing the lifecycle and acquisition logic without a server
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────┐
//! │         ConnectionManager         │
//! │        AcquisitionEngine          │
//! └─────────────────┬─────────────────┘
//!                   │
//!         ┌─────────▼─────────┐
//!         │ RemoteDataSource  │
//!         └─────────┬─────────┘
//!                   │
//!        ┌──────────┴──────────┐
//!        ▼                     ▼
//! ┌─────────────┐      ┌─────────────┐
//! │ DCOM client │      │  Simulated  │
//! └─────────────┘      └─────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use opcda_core::{DataSource, ItemId, ReadResult, RemoteError, ServerHandle, StatusCode};

use crate::types::Credentials;

// =============================================================================
// Remote handles
// =============================================================================

/// A DCOM session with its security context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// An instantiated OPC server object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerObjectHandle(pub u64);

/// A server-side group. Its item manager and sync-read interface live and
/// die with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupHandle(pub u64);

/// A remote resource that must be released on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteResource {
    /// The synchronous read interface of a group.
    SyncIo(GroupHandle),
    /// The item manager of a group.
    ItemManager(GroupHandle),
    /// The group itself.
    Group(GroupHandle),
    /// The server object.
    Server(ServerObjectHandle),
    /// The session stub.
    Session(SessionHandle),
}

impl RemoteResource {
    /// Returns the teardown order of the resources that exist.
    ///
    /// Group interfaces go first, the session stub last.
    pub fn teardown_order(
        session: Option<SessionHandle>,
        server: Option<ServerObjectHandle>,
        group: Option<GroupHandle>,
    ) -> Vec<RemoteResource> {
        let mut order = Vec::with_capacity(5);
        if let Some(group) = group {
            order.push(RemoteResource::SyncIo(group));
            order.push(RemoteResource::ItemManager(group));
            order.push(RemoteResource::Group(group));
        }
        if let Some(server) = server {
            order.push(RemoteResource::Server(server));
        }
        if let Some(session) = session {
            order.push(RemoteResource::Session(session));
        }
        order
    }
}

impl fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncIo(g) => write!(f, "sync-io({})", g.0),
            Self::ItemManager(g) => write!(f, "item-manager({})", g.0),
            Self::Group(g) => write!(f, "group({})", g.0),
            Self::Server(s) => write!(f, "server({})", s.0),
            Self::Session(s) => write!(f, "session({})", s.0),
        }
    }
}

/// Asynchronous notification from the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The underlying session went away without a local disconnect.
    Dropped,
}

/// Per-item result of an add: the handle, or the status code it was
/// rejected with.
pub type AddItemOutcome = Result<ServerHandle, StatusCode>;

// =============================================================================
// RemoteDataSource Trait
// =============================================================================

/// Capability to talk to an OPC DA server.
///
/// Implementations must be safe to call concurrently; the reader fans out
/// per-handle reads for ad-hoc tag requests.
#[async_trait]
pub trait RemoteDataSource: Send + Sync + 'static {
    /// Creates a session with the given security context.
    async fn create_session(
        &self,
        domain: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<SessionHandle, RemoteError>;

    /// Instantiates the server identified by `clsid` on `address`.
    async fn connect(
        &self,
        clsid: &str,
        address: &str,
        session: SessionHandle,
    ) -> Result<ServerObjectHandle, RemoteError>;

    /// Adds a group to the server.
    async fn add_group(
        &self,
        server: ServerObjectHandle,
        name: &str,
    ) -> Result<GroupHandle, RemoteError>;

    /// Adds items to a group. Returns one outcome per item, in order.
    async fn add_items(
        &self,
        group: GroupHandle,
        items: &[ItemId],
    ) -> Result<Vec<AddItemOutcome>, RemoteError>;

    /// Removes items from a group.
    async fn remove_items(
        &self,
        group: GroupHandle,
        handles: &[ServerHandle],
    ) -> Result<(), RemoteError>;

    /// Reads the given handles in one call.
    async fn read(
        &self,
        group: GroupHandle,
        source: DataSource,
        handles: &[ServerHandle],
    ) -> Result<Vec<ReadResult>, RemoteError>;

    /// Releases one resource. Releasing an absent resource succeeds.
    async fn teardown(&self, resource: RemoteResource) -> Result<(), RemoteError>;

    /// Lists every item identifier of the server's address space.
    async fn browse_flat(&self, server: ServerObjectHandle) -> Result<Vec<ItemId>, RemoteError>;

    /// Subscribes to session events.
    fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_order_full() {
        let order = RemoteResource::teardown_order(
            Some(SessionHandle(1)),
            Some(ServerObjectHandle(2)),
            Some(GroupHandle(3)),
        );
        assert_eq!(
            order,
            vec![
                RemoteResource::SyncIo(GroupHandle(3)),
                RemoteResource::ItemManager(GroupHandle(3)),
                RemoteResource::Group(GroupHandle(3)),
                RemoteResource::Server(ServerObjectHandle(2)),
                RemoteResource::Session(SessionHandle(1)),
            ]
        );
    }

    #[test]
    fn test_teardown_order_partial() {
        let order = RemoteResource::teardown_order(Some(SessionHandle(1)), None, None);
        assert_eq!(order, vec![RemoteResource::Session(SessionHandle(1))]);
        assert!(RemoteResource::teardown_order(None, None, None).is_empty());
    }

    #[test]
    fn test_resource_display() {
        assert_eq!(RemoteResource::Group(GroupHandle(7)).to_string(), "group(7)");
    }
}

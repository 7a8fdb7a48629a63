// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A scriptable [`RemoteDataSource`] for exercising the reader without a
//! server.
//!
//! ## Design Principles
//!
//! - Configurable behavior for different test scenarios
//! - Recording of interactions for verification
//! - Thread-safe for concurrent testing
//! - Easy to set up error injection

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use opcda_client::client::{
    AddItemOutcome, GroupHandle, RemoteResource, ServerObjectHandle, SessionEvent, SessionHandle,
};
use opcda_client::{Credentials, RemoteDataSource};
use opcda_core::{DaValue, DataSource, ItemId, ReadResult, RemoteError, ServerHandle, StatusCode};

// =============================================================================
// Mock Data Source
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    values: HashMap<ItemId, (DaValue, i64)>,
    add_rejections: HashMap<ItemId, StatusCode>,
    connect_failures: VecDeque<RemoteError>,
    connect_delays: VecDeque<Duration>,
    read_failures: VecDeque<RemoteError>,
    failing_items: HashSet<ItemId>,
    truncate_next_read: Option<usize>,
    read_delay: Duration,
    live_sessions: HashSet<SessionHandle>,
    live_groups: HashSet<GroupHandle>,
    handles: HashMap<ServerHandle, (GroupHandle, ItemId)>,
    next_handle: u32,
    teardown_log: Vec<RemoteResource>,
    added: Vec<ItemId>,
    removed: Vec<ServerHandle>,
    read_handles: Vec<ServerHandle>,
}

/// A scriptable remote data source.
///
/// Items without a configured value read as `0` with quality 192. Handles
/// are never reused and die with their group, so a stale read fails with
/// `0xC0040001`.
#[derive(Debug)]
pub struct MockDataSource {
    state: Mutex<MockState>,
    events: broadcast::Sender<SessionEvent>,
    next_id: AtomicU64,
    create_session_calls: AtomicU64,
    connect_calls: AtomicU64,
    add_items_calls: AtomicU64,
    read_calls: AtomicU64,
    remove_calls: AtomicU64,
}

impl MockDataSource {
    /// Create a new mock with an open address space.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MockState {
                next_handle: 1,
                ..Default::default()
            }),
            events,
            next_id: AtomicU64::new(1),
            create_session_calls: AtomicU64::new(0),
            connect_calls: AtomicU64::new(0),
            add_items_calls: AtomicU64::new(0),
            read_calls: AtomicU64::new(0),
            remove_calls: AtomicU64::new(0),
        }
    }

    /// Set the value and quality an item reads as.
    pub fn set_value(&self, item: impl Into<ItemId>, value: impl Into<DaValue>, quality: i64) {
        self.state
            .lock()
            .values
            .insert(item.into(), (value.into(), quality));
    }

    /// Make adds of `item` fail with `code`.
    pub fn reject_item(&self, item: impl Into<ItemId>, code: StatusCode) {
        self.state.lock().add_rejections.insert(item.into(), code);
    }

    /// Make the next connect fail with `err`. Calls queue up.
    pub fn fail_next_connect(&self, err: RemoteError) {
        self.state.lock().connect_failures.push_back(err);
    }

    /// Make the next connect take `delay`. Calls queue up.
    pub fn delay_next_connect(&self, delay: Duration) {
        self.state.lock().connect_delays.push_back(delay);
    }

    /// Make the next read call fail with `err`. Calls queue up.
    pub fn fail_next_read(&self, err: RemoteError) {
        self.state.lock().read_failures.push_back(err);
    }

    /// Make every read that includes `item` fail until cleared.
    pub fn fail_reads_for(&self, item: impl Into<ItemId>) {
        self.state.lock().failing_items.insert(item.into());
    }

    /// Stop failing reads that include `item`.
    pub fn clear_read_failures_for(&self, item: &ItemId) {
        self.state.lock().failing_items.remove(item);
    }

    /// Make the next read return only its first `count` results.
    pub fn truncate_next_read(&self, count: usize) {
        self.state.lock().truncate_next_read = Some(count);
    }

    /// Set the latency of every read.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = delay;
    }

    /// Fire the session dropped event.
    pub fn drop_session(&self) {
        let _ = self.events.send(SessionEvent::Dropped);
    }

    /// Get the create_session call count.
    pub fn create_session_calls(&self) -> u64 {
        self.create_session_calls.load(Ordering::SeqCst)
    }

    /// Get the connect call count.
    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Get the add_items call count.
    pub fn add_items_calls(&self) -> u64 {
        self.add_items_calls.load(Ordering::SeqCst)
    }

    /// Get the read call count.
    pub fn read_calls(&self) -> u64 {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Get the remove_items call count.
    pub fn remove_calls(&self) -> u64 {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// How many times `item` was requested through add_items.
    pub fn times_added(&self, item: &ItemId) -> usize {
        self.state.lock().added.iter().filter(|i| *i == item).count()
    }

    /// Every handle passed to remove_items.
    pub fn removed_handles(&self) -> Vec<ServerHandle> {
        self.state.lock().removed.clone()
    }

    /// Every handle passed to read, in call order.
    pub fn read_handles(&self) -> Vec<ServerHandle> {
        self.state.lock().read_handles.clone()
    }

    /// Every resource released, in order.
    pub fn teardown_log(&self) -> Vec<RemoteResource> {
        self.state.lock().teardown_log.clone()
    }

    /// Number of sessions not yet torn down.
    pub fn live_sessions(&self) -> usize {
        self.state.lock().live_sessions.len()
    }

    /// Number of handles whose group is still alive.
    pub fn live_handles(&self) -> usize {
        self.state.lock().handles.len()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MockDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteDataSource for MockDataSource {
    async fn create_session(
        &self,
        _domain: &str,
        _credentials: &Credentials,
        _timeout: Duration,
    ) -> Result<SessionHandle, RemoteError> {
        self.create_session_calls.fetch_add(1, Ordering::SeqCst);
        let session = SessionHandle(self.next_id());
        self.state.lock().live_sessions.insert(session);
        Ok(session)
    }

    async fn connect(
        &self,
        _clsid: &str,
        _address: &str,
        session: SessionHandle,
    ) -> Result<ServerObjectHandle, RemoteError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let (failure, delay) = {
            let mut state = self.state.lock();
            (
                state.connect_failures.pop_front(),
                state.connect_delays.pop_front(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        if !self.state.lock().live_sessions.contains(&session) {
            return Err(RemoteError::transport("session is closed"));
        }
        Ok(ServerObjectHandle(self.next_id()))
    }

    async fn add_group(
        &self,
        _server: ServerObjectHandle,
        _name: &str,
    ) -> Result<GroupHandle, RemoteError> {
        let group = GroupHandle(self.next_id());
        self.state.lock().live_groups.insert(group);
        Ok(group)
    }

    async fn add_items(
        &self,
        group: GroupHandle,
        items: &[ItemId],
    ) -> Result<Vec<AddItemOutcome>, RemoteError> {
        self.add_items_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.live_groups.contains(&group) {
            return Err(RemoteError::Status(StatusCode::INVALID_HANDLE));
        }
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            state.added.push(item.clone());
            if let Some(code) = state.add_rejections.get(item) {
                outcomes.push(Err(*code));
                continue;
            }
            let handle = ServerHandle::new(state.next_handle);
            state.next_handle += 1;
            state.handles.insert(handle, (group, item.clone()));
            outcomes.push(Ok(handle));
        }
        Ok(outcomes)
    }

    async fn remove_items(
        &self,
        _group: GroupHandle,
        handles: &[ServerHandle],
    ) -> Result<(), RemoteError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        for handle in handles {
            state.handles.remove(handle);
            state.removed.push(*handle);
        }
        Ok(())
    }

    async fn read(
        &self,
        group: GroupHandle,
        _source: DataSource,
        handles: &[ServerHandle],
    ) -> Result<Vec<ReadResult>, RemoteError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.read_handles.extend_from_slice(handles);
        if let Some(err) = state.read_failures.pop_front() {
            return Err(err);
        }

        let now = Utc::now();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let item = match state.handles.get(handle) {
                Some((owner, item)) if *owner == group => item.clone(),
                _ => return Err(RemoteError::Status(StatusCode::INVALID_HANDLE)),
            };
            if state.failing_items.contains(&item) {
                return Err(RemoteError::Status(StatusCode::UNKNOWN_ITEM_ID));
            }
            let (value, quality) = state
                .values
                .get(&item)
                .cloned()
                .unwrap_or((DaValue::Int(0), 192));
            results.push(ReadResult::new(item, value, quality, now));
        }
        if let Some(count) = state.truncate_next_read.take() {
            results.truncate(count);
        }
        Ok(results)
    }

    async fn teardown(&self, resource: RemoteResource) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.teardown_log.push(resource);
        match resource {
            RemoteResource::Group(group) => {
                state.live_groups.remove(&group);
                state.handles.retain(|_, (owner, _)| *owner != group);
            }
            RemoteResource::Session(session) => {
                state.live_sessions.remove(&session);
            }
            RemoteResource::SyncIo(_) | RemoteResource::ItemManager(_) | RemoteResource::Server(_) => {}
        }
        Ok(())
    }

    async fn browse_flat(&self, _server: ServerObjectHandle) -> Result<Vec<ItemId>, RemoteError> {
        let state = self.state.lock();
        let mut items: Vec<ItemId> = state.values.keys().cloned().collect();
        items.sort();
        Ok(items)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

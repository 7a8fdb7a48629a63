// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory OPC DA server.
//!
//! [`SimulatedDataSource`] implements [`RemoteDataSource`] without DCOM. It
//! keeps an address space of integer and float points whose values drift by
//! a small random step on every device read. It answers with the same status
//! codes a real server uses for unknown items, malformed clsids and stale
//! handles, so the whole reader can run against it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::broadcast;
use tracing::debug;

use opcda_core::{
    DaValue, DataSource, ItemId, ReadResult, RemoteError, ServerHandle, StatusCode,
};

use super::transport::{
    AddItemOutcome, GroupHandle, RemoteDataSource, RemoteResource, ServerObjectHandle,
    SessionEvent, SessionHandle,
};
use crate::types::Credentials;

const GOOD_QUALITY: i64 = 192;

#[derive(Debug, Clone)]
struct SimPoint {
    value: DaValue,
    quality: i64,
}

#[derive(Debug, Default)]
struct SimState {
    points: BTreeMap<ItemId, SimPoint>,
    open_address_space: bool,
    required_credentials: Option<Credentials>,
    sessions: HashSet<SessionHandle>,
    servers: HashMap<ServerObjectHandle, SessionHandle>,
    groups: HashMap<GroupHandle, HashMap<ServerHandle, ItemId>>,
    next_handle: u32,
    pending_read_failures: Vec<StatusCode>,
}

/// An in-memory OPC DA server.
#[derive(Debug)]
pub struct SimulatedDataSource {
    state: Mutex<SimState>,
    events: broadcast::Sender<SessionEvent>,
    next_id: AtomicU64,
    add_item_calls: AtomicU64,
    read_calls: AtomicU64,
}

impl SimulatedDataSource {
    /// A clsid the simulator accepts.
    pub const CLSID: &'static str = "F8582CF2-88FB-11D0-B850-00C0F0104305";

    /// Creates a simulator that accepts any well-formed item identifier.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(SimState {
                open_address_space: true,
                next_handle: 1,
                ..Default::default()
            }),
            events,
            next_id: AtomicU64::new(1),
            add_item_calls: AtomicU64::new(0),
            read_calls: AtomicU64::new(0),
        }
    }

    /// Creates a simulator whose address space is exactly `items`.
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ItemId>,
        V: Into<DaValue>,
    {
        let sim = Self::new();
        {
            let mut state = sim.state.lock();
            state.open_address_space = false;
            for (id, value) in items {
                state.points.insert(
                    id.into(),
                    SimPoint {
                        value: value.into(),
                        quality: GOOD_QUALITY,
                    },
                );
            }
        }
        sim
    }

    /// Requires sessions to present exactly these credentials.
    pub fn require_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.state.lock().required_credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the value and quality of an item, creating it if needed.
    pub fn set_value(&self, id: impl Into<ItemId>, value: impl Into<DaValue>, quality: i64) {
        self.state.lock().points.insert(
            id.into(),
            SimPoint {
                value: value.into(),
                quality,
            },
        );
    }

    /// Makes the next read call fail with `code`.
    pub fn fail_next_read(&self, code: StatusCode) {
        self.state.lock().pending_read_failures.push(code);
    }

    /// Drops every session and notifies subscribers.
    pub fn drop_session(&self) {
        {
            let mut state = self.state.lock();
            state.sessions.clear();
            state.servers.clear();
            state.groups.clear();
        }
        debug!("Simulated session dropped");
        let _ = self.events.send(SessionEvent::Dropped);
    }

    /// Number of open sessions.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Total items requested through `add_items`.
    pub fn add_item_calls(&self) -> u64 {
        self.add_item_calls.load(Ordering::Relaxed)
    }

    /// Total `read` calls.
    pub fn read_calls(&self) -> u64 {
        self.read_calls.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn is_valid_clsid(clsid: &str) -> bool {
        let clsid = clsid.trim_start_matches('{').trim_end_matches('}');
        clsid.len() == 36
            && clsid.char_indices().all(|(i, c)| match i {
                8 | 13 | 18 | 23 => c == '-',
                _ => c.is_ascii_hexdigit(),
            })
    }

    fn drift(value: &DaValue) -> DaValue {
        let mut rng = rand::thread_rng();
        match value {
            DaValue::Int(v) => DaValue::Int(v + rng.gen_range(-2..=2)),
            DaValue::Float(v) => DaValue::Float(v + rng.gen_range(-0.5..=0.5)),
            DaValue::Bool(v) if rng.gen_bool(0.1) => DaValue::Bool(!v),
            other => other.clone(),
        }
    }
}

impl Default for SimulatedDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteDataSource for SimulatedDataSource {
    async fn create_session(
        &self,
        _domain: &str,
        credentials: &Credentials,
        _timeout: Duration,
    ) -> Result<SessionHandle, RemoteError> {
        let mut state = self.state.lock();
        if let Some(required) = &state.required_credentials {
            if required != credentials {
                return Err(RemoteError::Status(StatusCode::ACCESS_DENIED));
            }
        }
        let session = SessionHandle(self.next_id());
        state.sessions.insert(session);
        Ok(session)
    }

    async fn connect(
        &self,
        clsid: &str,
        _address: &str,
        session: SessionHandle,
    ) -> Result<ServerObjectHandle, RemoteError> {
        if !Self::is_valid_clsid(clsid) {
            return Err(RemoteError::Status(StatusCode::INVALID_CLSID_SYNTAX));
        }
        if !clsid.eq_ignore_ascii_case(Self::CLSID) && !clsid.contains(Self::CLSID) {
            return Err(RemoteError::Status(StatusCode::CLSID_NOT_FOUND));
        }
        let mut state = self.state.lock();
        if !state.sessions.contains(&session) {
            return Err(RemoteError::transport("session is closed"));
        }
        let server = ServerObjectHandle(self.next_id());
        state.servers.insert(server, session);
        Ok(server)
    }

    async fn add_group(
        &self,
        server: ServerObjectHandle,
        name: &str,
    ) -> Result<GroupHandle, RemoteError> {
        let mut state = self.state.lock();
        if !state.servers.contains_key(&server) {
            return Err(RemoteError::transport("server object released"));
        }
        let group = GroupHandle(self.next_id());
        state.groups.insert(group, HashMap::new());
        debug!(group = name, "Simulated group added");
        Ok(group)
    }

    async fn add_items(
        &self,
        group: GroupHandle,
        items: &[ItemId],
    ) -> Result<Vec<AddItemOutcome>, RemoteError> {
        self.add_item_calls
            .fetch_add(items.len() as u64, Ordering::Relaxed);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.groups.contains_key(&group) {
            return Err(RemoteError::Status(StatusCode::INVALID_HANDLE));
        }

        let mut outcomes = Vec::with_capacity(items.len());
        for id in items {
            if id.is_blank() || id.as_str().chars().any(char::is_whitespace) {
                outcomes.push(Err(StatusCode::INVALID_ITEM_ID));
                continue;
            }
            if !state.points.contains_key(id) {
                if !state.open_address_space {
                    outcomes.push(Err(StatusCode::UNKNOWN_ITEM_ID));
                    continue;
                }
                state.points.insert(
                    id.clone(),
                    SimPoint {
                        value: DaValue::Int(0),
                        quality: GOOD_QUALITY,
                    },
                );
            }
            let handle = ServerHandle::new(state.next_handle);
            state.next_handle += 1;
            if let Some(members) = state.groups.get_mut(&group) {
                members.insert(handle, id.clone());
            }
            outcomes.push(Ok(handle));
        }
        Ok(outcomes)
    }

    async fn remove_items(
        &self,
        group: GroupHandle,
        handles: &[ServerHandle],
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let members = state
            .groups
            .get_mut(&group)
            .ok_or(RemoteError::Status(StatusCode::INVALID_HANDLE))?;
        for handle in handles {
            members.remove(handle);
        }
        Ok(())
    }

    async fn read(
        &self,
        group: GroupHandle,
        source: DataSource,
        handles: &[ServerHandle],
    ) -> Result<Vec<ReadResult>, RemoteError> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(code) = state.pending_read_failures.pop() {
            return Err(RemoteError::Status(code));
        }
        let members = state
            .groups
            .get(&group)
            .ok_or(RemoteError::Status(StatusCode::INVALID_HANDLE))?;

        let now = Utc::now();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let id = members
                .get(handle)
                .ok_or(RemoteError::Status(StatusCode::INVALID_HANDLE))?;
            let point = state
                .points
                .get_mut(id)
                .ok_or(RemoteError::Status(StatusCode::UNKNOWN_ITEM_ID))?;
            if source == DataSource::Device {
                point.value = Self::drift(&point.value);
            }
            results.push(ReadResult::new(id.clone(), point.value.clone(), point.quality, now));
        }
        Ok(results)
    }

    async fn teardown(&self, resource: RemoteResource) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        match resource {
            RemoteResource::SyncIo(_) | RemoteResource::ItemManager(_) => {}
            RemoteResource::Group(group) => {
                state.groups.remove(&group);
            }
            RemoteResource::Server(server) => {
                state.servers.remove(&server);
            }
            RemoteResource::Session(session) => {
                state.sessions.remove(&session);
            }
        }
        Ok(())
    }

    async fn browse_flat(&self, server: ServerObjectHandle) -> Result<Vec<ItemId>, RemoteError> {
        let state = self.state.lock();
        if !state.servers.contains_key(&server) {
            return Err(RemoteError::transport("server object released"));
        }
        Ok(state.points.keys().cloned().collect())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the remote session and everything created on
//! it: the server object, the group and the item handles. It runs the
//! connection state machine:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Ready
//!                                 │                │ read failure /
//!                                 │ error          │ session dropped
//!                                 ▼                ▼
//!                         (retryable) ◀──── Reconnecting
//!                                 │
//!                         (fatal) ▼
//!                               Fatal
//! ```
//!
//! Connect, disconnect and the reconnect teardown are serialized by one
//! lifecycle lock. The reconnect loop holds a single slot so overlapping
//! failure signals start at most one loop. Reads borrow the session through
//! a read guard, so teardown waits for in-flight reads and no handle is used
//! after its session is gone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use opcda_core::{ConfigurationError, ConnectError, ConnectionState, NodeStatus};

use super::handles::HandleCache;
use super::transport::{
    GroupHandle, RemoteDataSource, RemoteResource, ServerObjectHandle, SessionEvent,
    SessionHandle,
};
use crate::reporter::StatusReporter;
use crate::types::{ReaderConfig, ServerSettings};

// =============================================================================
// Sessions
// =============================================================================

/// Remote resources of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    /// The session stub.
    pub session: SessionHandle,
    /// The server object.
    pub server: ServerObjectHandle,
    /// The configured group.
    pub group: GroupHandle,
}

impl ActiveSession {
    fn resources(&self) -> Vec<RemoteResource> {
        RemoteResource::teardown_order(Some(self.session), Some(self.server), Some(self.group))
    }
}

/// Resources created so far by an in-flight connect.
#[derive(Debug, Default)]
struct PendingSession {
    session: Option<SessionHandle>,
    server: Option<ServerObjectHandle>,
    group: Option<GroupHandle>,
}

impl PendingSession {
    fn resources(&self) -> Vec<RemoteResource> {
        RemoteResource::teardown_order(self.session, self.server, self.group)
    }
}

/// How a reconnect loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Connected again after `attempts` attempts.
    Connected {
        /// Number of connect attempts made.
        attempts: u64,
    },
    /// Another loop was already running.
    AlreadyRunning,
    /// Stopped on a fatal error.
    Fatal(ConnectError),
    /// The state machine was already fatal.
    Stopped,
    /// Shutdown was requested.
    Cancelled,
}

// =============================================================================
// ConnectionStats
// =============================================================================

/// Connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    connect_attempts: AtomicU64,
    connects: AtomicU64,
    connect_failures: AtomicU64,
    timeouts: AtomicU64,
    reconnect_attempts: AtomicU64,
    session_drops: AtomicU64,
}

impl ConnectionStats {
    fn record_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, err: &ConnectError) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
        if err.is_timeout() {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_reconnect(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_session_drop(&self) {
        self.session_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of the counters.
    pub fn snapshot(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            session_drops: self.session_drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ConnectionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatsSnapshot {
    /// Connect attempts, initial and reconnect.
    pub connect_attempts: u64,
    /// Successful connects.
    pub connects: u64,
    /// Failed connects.
    pub connect_failures: u64,
    /// Connects that hit the timeout.
    pub timeouts: u64,
    /// Iterations of the reconnect loop.
    pub reconnect_attempts: u64,
    /// Session-dropped notifications received.
    pub session_drops: u64,
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Owns the session of one reader instance.
pub struct ConnectionManager<S: RemoteDataSource> {
    source: Arc<S>,
    settings: ServerSettings,
    config: ReaderConfig,
    reporter: Arc<dyn StatusReporter>,
    handles: HandleCache,
    session: RwLock<Option<ActiveSession>>,
    lifecycle: Mutex<()>,
    reconnect_slot: Mutex<()>,
    reconnect_pending: AtomicBool,
    state_tx: watch::Sender<ConnectionState>,
    watcher: SyncMutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    stats: ConnectionStats,
}

impl<S: RemoteDataSource> ConnectionManager<S> {
    /// Creates a manager after validating its configuration.
    pub fn new(
        source: Arc<S>,
        settings: ServerSettings,
        config: ReaderConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Arc<Self>, ConfigurationError> {
        settings.validate()?;
        config.validate()?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Arc::new(Self {
            source,
            settings,
            config,
            reporter,
            handles: HandleCache::new(),
            session: RwLock::new(None),
            lifecycle: Mutex::new(()),
            reconnect_slot: Mutex::new(()),
            reconnect_pending: AtomicBool::new(false),
            state_tx,
            watcher: SyncMutex::new(None),
            shutdown: CancellationToken::new(),
            stats: ConnectionStats::default(),
        }))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Returns the handle cache.
    pub fn handles(&self) -> &HandleCache {
        &self.handles
    }

    /// Returns the remote data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Returns the reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Returns the status reporter.
    pub fn reporter(&self) -> &Arc<dyn StatusReporter> {
        &self.reporter
    }

    /// Returns the connection counters.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Returns `true` once shutdown was requested.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Borrows the active session for the duration of a remote call.
    ///
    /// Teardown waits until the guard is dropped.
    pub async fn session(&self) -> RwLockReadGuard<'_, Option<ActiveSession>> {
        self.session.read().await
    }

    fn set_state(&self, new_state: ConnectionState) {
        let old_state = self.state_tx.send_replace(new_state);
        if old_state != new_state {
            trace!(from = %old_state, to = %new_state, "Connection state changed");
        }
    }

    // =========================================================================
    // Connect
    // =========================================================================

    /// Connects and adds the configured items.
    ///
    /// At most one connect runs at a time. The whole sequence is bounded by
    /// the configured timeout; on expiry or failure every resource created
    /// so far is released. Calling this while connected does nothing.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ConnectError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.shutdown.is_cancelled() {
            return Err(ConnectError::Cancelled);
        }
        if self.session.read().await.is_some() {
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        self.reporter.report_status(NodeStatus::Connecting);
        self.stats.record_attempt();
        info!(
            address = %self.settings.address,
            clsid = %self.settings.clsid,
            group = %self.config.group_name,
            "Connecting to OPC DA server"
        );

        let pending = SyncMutex::new(PendingSession::default());
        let timeout = self.settings.timeout;
        let attempt = tokio::select! {
            result = tokio::time::timeout(timeout, self.establish(&pending)) => match result {
                Ok(result) => result,
                Err(_) => Err(ConnectError::timeout(timeout)),
            },
            _ = self.shutdown.cancelled() => Err(ConnectError::Cancelled),
        };

        match attempt {
            Ok(active) => {
                *self.session.write().await = Some(active);
                self.set_state(ConnectionState::Ready);
                self.reporter.report_status(NodeStatus::Ready);
                self.stats.record_connect();
                self.watch_session();
                info!(
                    address = %self.settings.address,
                    items = self.handles.len(),
                    "Connected to OPC DA server"
                );
                Ok(())
            }
            Err(err) => {
                let partial = pending.into_inner();
                self.release(partial.resources()).await;
                self.handles.clear();
                self.stats.record_failure(&err);
                self.on_connect_failure(&err);
                Err(err)
            }
        }
    }

    async fn establish(
        &self,
        pending: &SyncMutex<PendingSession>,
    ) -> Result<ActiveSession, ConnectError> {
        let session = self
            .source
            .create_session(
                &self.settings.domain,
                &self.settings.credentials,
                self.settings.timeout,
            )
            .await?;
        pending.lock().session = Some(session);

        let server = self
            .source
            .connect(&self.settings.clsid, &self.settings.address, session)
            .await?;
        pending.lock().server = Some(server);

        let group = self
            .source
            .add_group(server, &self.config.group_name)
            .await?;
        pending.lock().group = Some(group);

        let resolutions = self
            .handles
            .ensure(self.source.as_ref(), group, &self.config.items)
            .await?;
        for err in resolutions.iter().filter_map(|r| r.outcome.as_ref().err()) {
            warn!(
                item = %err.item,
                code = %err.code,
                description = err.description().unwrap_or_default(),
                "{err}"
            );
        }

        Ok(ActiveSession {
            session,
            server,
            group,
        })
    }

    fn on_connect_failure(&self, err: &ConnectError) {
        match err {
            ConnectError::Cancelled => {
                debug!("Connect cancelled by shutdown");
                self.set_state(ConnectionState::Disconnected);
            }
            ConnectError::Timeout { timeout } => {
                warn!(address = %self.settings.address, timeout = ?timeout, "Connection Timeout");
                self.reporter.report_status(NodeStatus::Timeout);
                self.set_state(ConnectionState::Disconnected);
            }
            _ if err.is_fatal() => {
                error!(
                    address = %self.settings.address,
                    code = %err.code().map(|c| c.to_string()).unwrap_or_default(),
                    description = err.description().unwrap_or_default(),
                    "Unrecoverable connect error, giving up"
                );
                self.reporter.report_status(NodeStatus::Error);
                self.set_state(ConnectionState::Fatal);
            }
            _ => {
                warn!(
                    address = %self.settings.address,
                    code = %err.code().map(|c| c.to_string()).unwrap_or_default(),
                    description = err.description().unwrap_or_default(),
                    "Connect failed: {err}"
                );
                self.reporter.report_status(NodeStatus::Error);
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }

    fn watch_session(self: &Arc<Self>) {
        let mut events = self.source.subscribe_events();
        let manager: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Dropped) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(skipped, "Session events lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
            let Some(manager) = manager.upgrade() else {
                return;
            };
            warn!(address = %manager.settings.address, "Session dropped by remote side");
            manager.stats.record_session_drop();
            manager.reporter.report_status(NodeStatus::Disconnected);
            manager.request_reconnect();
        });

        if let Some(previous) = self.watcher.lock().replace(task) {
            previous.abort();
        }
    }

    fn stop_watching(&self) {
        if let Some(task) = self.watcher.lock().take() {
            task.abort();
        }
    }

    // =========================================================================
    // Disconnect
    // =========================================================================

    /// Tears the session down. Safe to call in any state and repeatedly.
    ///
    /// A fatal state is kept so the terminal error stays visible.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await;
        if !self.state().is_fatal() {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    async fn teardown(&self) {
        self.stop_watching();
        let active = self.session.write().await.take();
        let dropped = self.handles.clear();
        if let Some(active) = active {
            self.release(active.resources()).await;
            info!(
                address = %self.settings.address,
                handles = dropped,
                "Disconnected from OPC DA server"
            );
        }
    }

    async fn release(&self, resources: Vec<RemoteResource>) {
        for resource in resources {
            if let Err(err) = self.source.teardown(resource).await {
                warn!(resource = %resource, error = %err, "Teardown step failed");
            }
        }
    }

    // =========================================================================
    // Reconnect
    // =========================================================================

    /// Runs the reconnect loop until connected, fatal, or shut down.
    ///
    /// Each iteration clears every cached handle, disconnects, waits the
    /// fixed reconnect delay and connects. Retryable errors loop without a
    /// bound. Only one loop runs at a time; a second call returns
    /// [`ReconnectOutcome::AlreadyRunning`] immediately. A request turned
    /// away that way is picked up by the running loop once it connects.
    pub async fn reconnect_loop(self: &Arc<Self>) -> ReconnectOutcome {
        let mut finished = None;
        loop {
            let Ok(slot) = self.reconnect_slot.try_lock() else {
                debug!("Reconnect already in progress");
                return finished.unwrap_or(ReconnectOutcome::AlreadyRunning);
            };
            let outcome = self.run_reconnect().await;
            drop(slot);

            let connected = matches!(outcome, ReconnectOutcome::Connected { .. });
            if !connected || !self.reconnect_pending.load(Ordering::SeqCst) {
                return outcome;
            }
            info!("Reconnect requested while connecting, reconnecting again");
            finished = Some(outcome);
        }
    }

    async fn run_reconnect(self: &Arc<Self>) -> ReconnectOutcome {
        let delay = self.config.reconnect_delay;
        let mut attempts: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return ReconnectOutcome::Cancelled;
            }
            if self.state().is_fatal() {
                return ReconnectOutcome::Stopped;
            }

            attempts += 1;
            self.stats.record_reconnect();
            {
                let _lifecycle = self.lifecycle.lock().await;
                self.set_state(ConnectionState::Reconnecting);
                self.teardown().await;
            }
            info!(attempt = attempts, delay = ?delay, "Reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.cancelled() => {
                    self.set_state(ConnectionState::Disconnected);
                    return ReconnectOutcome::Cancelled;
                }
            }

            // Requests from here on concern the session about to be built.
            self.reconnect_pending.store(false, Ordering::SeqCst);
            match self.connect().await {
                Ok(()) => return ReconnectOutcome::Connected { attempts },
                Err(ConnectError::Cancelled) => return ReconnectOutcome::Cancelled,
                Err(err) if err.is_fatal() => return ReconnectOutcome::Fatal(err),
                Err(err) => {
                    debug!(attempt = attempts, error = %err, "Reconnect attempt failed, retrying");
                }
            }
        }
    }

    /// Starts the reconnect loop in the background.
    ///
    /// Moves a ready connection to `Reconnecting` right away so that no new
    /// acquisition starts against the failing session.
    pub fn request_reconnect(self: &Arc<Self>) -> JoinHandle<ReconnectOutcome> {
        self.mark_reconnect_pending();
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.reconnect_loop().await })
    }

    fn mark_reconnect_pending(&self) {
        self.reconnect_pending.store(true, Ordering::SeqCst);
        self.state_tx.send_if_modified(|state| {
            if state.is_ready() {
                *state = ConnectionState::Reconnecting;
                true
            } else {
                false
            }
        });
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Cancels pending connects and reconnect delays, then disconnects.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!(address = %self.settings.address, "Shutting down connection");
            self.shutdown.cancel();
        }
        self.disconnect().await;
    }
}

impl<S: RemoteDataSource> Drop for ConnectionManager<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.stop_watching();
    }
}

impl<S: RemoteDataSource> std::fmt::Debug for ConnectionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("address", &self.settings.address)
            .field("group", &self.config.group_name)
            .field("state", &self.state())
            .field("handles", &self.handles.len())
            .finish()
    }
}

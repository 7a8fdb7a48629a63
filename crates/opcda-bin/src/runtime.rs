// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reader runtime orchestration.
//!
//! The runtime owns one [`OpcDaReader`] on the simulated data source and
//! drives it with three tasks:
//!
//! - a poll loop that triggers a group read every poll interval
//! - an input loop that turns every line of input into one input event
//! - a printer that writes output messages as JSON lines and logs status
//!   transitions
//!
//! All three stop on the shared [`ShutdownCoordinator`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use opcda_client::{
    ChannelReporter, CycleOutcome, OpcDaReader, ReadRequest, ReporterEvent, SimulatedDataSource,
};
use opcda_config::{load_config, AppConfig, SimulatorConfig};
use opcda_core::{DaResult, DaValue, ItemId};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// How long trigger tasks get to finish their current cycle on shutdown.
const TASK_GRACE: Duration = Duration::from_secs(5);

type Reader = OpcDaReader<SimulatedDataSource>;

// =============================================================================
// Simulator
// =============================================================================

/// Builds the simulated server described by the simulator section.
///
/// An empty item list yields an open address space.
pub fn build_simulator(config: &SimulatorConfig) -> SimulatedDataSource {
    if config.items.is_empty() {
        return SimulatedDataSource::new();
    }
    let source = SimulatedDataSource::with_items(std::iter::empty::<(ItemId, DaValue)>());
    for item in &config.items {
        source.set_value(item.id.clone(), item.value.clone(), item.quality);
    }
    source
}

// =============================================================================
// ReaderRuntime
// =============================================================================

/// Runs one reader until shutdown.
pub struct ReaderRuntime {
    config: Arc<AppConfig>,
    shutdown: ShutdownCoordinator,
    poll_interval: Option<Duration>,
    read_input: bool,
}

impl ReaderRuntime {
    /// Creates a runtime that polls at the configured interval and reads
    /// input events.
    pub fn new(config: AppConfig) -> Self {
        Self {
            poll_interval: config.runtime.poll_interval,
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
            read_input: true,
        }
    }

    /// Returns the coordinator that stops this runtime.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Returns the effective poll interval.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    /// Runs on stdin and stdout until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        self.run_with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Runs with the given input and output until shutdown is signaled.
    ///
    /// When input ends and no poll interval is set, nothing can trigger a
    /// cycle anymore and the runtime shuts itself down.
    pub async fn run_with_io<R, W>(self, input: R, output: W) -> BinResult<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("Starting opcda v{}", crate::VERSION);

        let source = Arc::new(build_simulator(&self.config.simulator));
        let (reporter, events) = ChannelReporter::new();
        let reader = Arc::new(Reader::new(
            source,
            self.config.server.to_settings(),
            self.config.reader.clone(),
            Arc::new(reporter),
        )?);

        let printer = tokio::spawn(print_events(events, output, self.shutdown.clone()));

        if let Err(err) = reader.start().await {
            error!(error = %err, "Reader failed to start");
            reader.shutdown().await;
            self.shutdown.initiate_shutdown();
            let _ = printer.await;
            return Err(err.into());
        }

        let mut triggers: Vec<JoinHandle<()>> = Vec::new();
        if let Some(interval) = self.poll_interval {
            info!(interval = %humantime::format_duration(interval), "Polling group");
            triggers.push(tokio::spawn(poll_loop(
                Arc::clone(&reader),
                interval,
                self.shutdown.clone(),
            )));
        }
        if self.read_input {
            triggers.push(tokio::spawn(input_loop(
                Arc::clone(&reader),
                input,
                self.poll_interval.is_some(),
                self.shutdown.clone(),
            )));
        }
        if triggers.is_empty() {
            warn!("No poll interval and no input; waiting for shutdown");
        }

        info!(state = %reader.state(), "opcda is running");
        self.shutdown.wait_for_shutdown().await;
        info!("Shutdown initiated, cleaning up...");

        for mut task in triggers {
            if tokio::time::timeout(TASK_GRACE, &mut task).await.is_err() {
                warn!("Trigger task did not stop in time, aborting");
                task.abort();
            }
        }

        reader.shutdown().await;
        let stats = reader.stats();
        info!(
            cycles = stats.cycles,
            skipped = stats.skipped,
            read_errors = stats.read_errors,
            rejected_inputs = stats.rejected_inputs,
            reconnect_attempts = stats.connection.reconnect_attempts,
            "opcda shutdown complete"
        );

        match printer.await {
            Ok(result) => result,
            Err(e) => Err(BinError::runtime(format!("output task failed: {}", e))),
        }
    }
}

impl std::fmt::Debug for ReaderRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRuntime")
            .field("address", &self.config.server.address)
            .field("poll_interval", &self.poll_interval)
            .field("read_input", &self.read_input)
            .finish()
    }
}

// =============================================================================
// Tasks
// =============================================================================

async fn poll_loop(reader: Arc<Reader>, period: Duration, shutdown: ShutdownCoordinator) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.stopped() => break,
            _ = ticker.tick() => {
                let result = reader.handle_input(ReadRequest::Group).await;
                log_outcome("poll", &result);
            }
        }
    }
    debug!("Poll loop stopped");
}

async fn input_loop<R>(
    reader: Arc<Reader>,
    input: R,
    keep_running_on_eof: bool,
    shutdown: ShutdownCoordinator,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        tokio::select! {
            _ = shutdown.stopped() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let result = reader.handle_payload(&line).await;
                    log_outcome("input", &result);
                }
                Ok(None) => {
                    info!("Input closed");
                    if !keep_running_on_eof {
                        shutdown.initiate_shutdown();
                    }
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    if !keep_running_on_eof {
                        shutdown.initiate_shutdown();
                    }
                    break;
                }
            }
        }
    }
    debug!("Input loop stopped");
}

/// Writes output messages and logs status transitions until shutdown.
///
/// Events already queued when shutdown arrives are still written.
async fn print_events<W>(
    mut events: mpsc::UnboundedReceiver<ReporterEvent>,
    mut output: W,
    shutdown: ShutdownCoordinator,
) -> BinResult<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let event = tokio::select! {
            biased;
            event = events.recv() => event,
            _ = shutdown.stopped() => break,
        };
        match event {
            Some(event) => {
                if let Err(e) = write_event(&mut output, event).await {
                    shutdown.initiate_shutdown();
                    return Err(e);
                }
            }
            None => return Ok(()),
        }
    }

    while let Ok(event) = events.try_recv() {
        write_event(&mut output, event).await?;
    }
    Ok(())
}

async fn write_event<W>(output: &mut W, event: ReporterEvent) -> BinResult<()>
where
    W: AsyncWrite + Unpin,
{
    match event {
        ReporterEvent::Status(status) => {
            info!(status = %status, label = status.label(), "Status changed");
            Ok(())
        }
        ReporterEvent::Output(message) => {
            let mut line = match serde_json::to_string(&message) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize output message");
                    return Ok(());
                }
            };
            line.push('\n');
            output.write_all(line.as_bytes()).await?;
            output.flush().await?;
            Ok(())
        }
    }
}

fn log_outcome(trigger: &'static str, result: &DaResult<CycleOutcome>) {
    match result {
        Ok(CycleOutcome::Completed { status, output }) => debug!(
            trigger,
            status = %status,
            readings = output.as_ref().map_or(0, |o| o.len()),
            "Cycle completed"
        ),
        Ok(CycleOutcome::Skipped(reason)) => debug!(trigger, reason = ?reason, "Trigger skipped"),
        Err(e) => debug!(trigger, error = %e, "Cycle failed"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the reader runtime.
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<AppConfig>,
    poll_interval: Option<Duration>,
    read_input: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder that reads input events.
    pub fn new() -> Self {
        Self {
            read_input: true,
            ..Default::default()
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured poll interval.
    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        if interval.is_some() {
            self.poll_interval = interval;
        }
        self
    }

    /// Enables or disables the input loop.
    pub fn read_input(mut self, enabled: bool) -> Self {
        self.read_input = enabled;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<ReaderRuntime> {
        let config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_config(&path).map_err(|e| {
                    BinError::from(e)
                        .with_context(format!("Failed to load config from {}", path.display()))
                })?
            }
        };

        let mut runtime = ReaderRuntime::new(config);
        if self.poll_interval.is_some() {
            runtime.poll_interval = self.poll_interval;
        }
        runtime.read_input = self.read_input;
        Ok(runtime)
    }
}

// =============================================================================
// Tests
// =============================================================================

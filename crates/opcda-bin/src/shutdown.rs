// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process shutdown.
//!
//! SIGTERM, SIGINT, end of input and output failures all end the process
//! the same way: by cancelling one [`ShutdownCoordinator`] that the poll
//! loop, the input loop and the printer select on.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{info, warn};

/// Shared stop flag for the runtime's tasks.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once shutdown was initiated.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Fires the coordinator. Later calls do nothing.
    pub fn initiate_shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown initiated");
            self.token.cancel();
        }
    }

    /// Whether [`initiate_shutdown`](Self::initiate_shutdown) ran.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for an OS signal or a manual shutdown, whichever comes first.
    pub async fn wait_for_shutdown(&self) {
        tokio::select! {
            _ = self.stopped() => {}
            _ = os_signal() => self.initiate_shutdown(),
        }
    }
}

#[cfg(unix)]
async fn os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (term, int) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    );
    let (mut term, mut int) = match (term, int) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Signal handlers unavailable, using Ctrl-C only");
            return ctrl_c().await;
        }
    };
    tokio::select! {
        _ = term.recv() => info!(signal = "SIGTERM", "Signal received"),
        _ = int.recv() => info!(signal = "SIGINT", "Signal received"),
    }
}

#[cfg(not(unix))]
async fn os_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C listener failed");
        std::future::pending::<()>().await;
    }
    info!(signal = "ctrl-c", "Signal received");
}

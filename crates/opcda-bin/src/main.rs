// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! opcda - OPC DA data-acquisition reader
//!
//! Main binary entry point.

use std::time::Duration;

use clap::Parser;

use opcda_bin::commands::execute;
use opcda_bin::error::{report_error_and_exit, BinError};
use opcda_bin::{init_logging, Cli};

/// Blocking stdin reads cannot be cancelled; don't wait for them on exit.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() {
    let cli = Cli::parse();

    // A config that fails to load here is reported by the command itself.
    let logging = opcda_config::load_config(&cli.config)
        .ok()
        .map(|config| config.logging);
    init_logging(
        &cli.effective_log_level(logging.as_ref()),
        cli.effective_log_format(logging.as_ref()),
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => report_error_and_exit(BinError::init(format!(
            "Failed to build async runtime: {}",
            e
        ))),
    };

    let result = runtime.block_on(execute(cli));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        report_error_and_exit(e);
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// `opcda run`: acquires until a signal or the end of input.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .poll_interval(args.poll_interval)
        .read_input(!args.no_stdin)
        .build()?;

    info!(
        config = %cli.config.display(),
        stdin = !args.no_stdin,
        "Reader runtime built"
    );
    runtime.run().await
}

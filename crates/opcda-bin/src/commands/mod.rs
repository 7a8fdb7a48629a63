// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! One module per subcommand.

mod browse;
mod run;
mod validate;
mod version;

pub use browse::browse;
pub use run::run;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Dispatches `cli` to its subcommand.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Version => version(&cli),
        Commands::Validate(args) => validate(&cli, args),
        Commands::Browse(args) => browse(&cli, args).await,
        Commands::Run(args) => run(&cli, args).await,
    }
}

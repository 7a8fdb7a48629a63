// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

use crate::cli::Cli;
use crate::error::BinResult;

/// `opcda version`
pub fn version(_cli: &Cli) -> BinResult<()> {
    let components = [
        ("opcda-bin", crate::VERSION),
        ("opcda-core", opcda_core::VERSION),
        ("opcda-client", opcda_client::VERSION),
        ("opcda-config", opcda_config::VERSION),
    ];

    println!("opcda {} ({}/{})", crate::VERSION, std::env::consts::OS, std::env::consts::ARCH);
    for (name, version) in components {
        println!("  {name:<14}{version}");
    }
    println!(
        "  simulator     clsid {}",
        opcda_client::SimulatedDataSource::CLSID
    );
    Ok(())
}

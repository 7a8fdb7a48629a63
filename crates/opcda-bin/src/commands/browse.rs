// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `browse` command.

use tracing::info;

use opcda_client::browse_items;
use opcda_core::ItemId;

use crate::cli::{BrowseArgs, Cli, OutputFormat};
use crate::error::{BinError, BinResult};
use crate::runtime::build_simulator;

/// Executes the `browse` command to list the server's items.
pub async fn browse(cli: &Cli, args: BrowseArgs) -> BinResult<()> {
    let config = opcda_config::load_config(&cli.config)?;
    let source = build_simulator(&config.simulator);

    let items = browse_items(&source, &config.server.to_settings()).await?;
    info!(address = %config.server.address, items = items.len(), "Browse complete");

    println!("{}", render(&items, args.format)?);
    Ok(())
}

fn render(items: &[ItemId], format: OutputFormat) -> BinResult<String> {
    let rendered = match format {
        OutputFormat::Text => items
            .iter()
            .map(ItemId::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(items)
            .map_err(|e| BinError::runtime(format!("Failed to serialize items: {}", e)))?,
        OutputFormat::Yaml => serde_yaml::to_string(items)
            .map_err(|e| BinError::runtime(format!("Failed to render YAML: {}", e)))?
            .trim_end()
            .to_string(),
    };
    Ok(rendered)
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::collections::HashSet;

use opcda_client::SimulatedDataSource;
use opcda_config::AppConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = opcda_config::load_config(config_path)
        .map_err(|e| BinError::config(format!("Configuration validation failed: {}", e)))?;

    let warnings = collect_warnings(&config);
    let poll = config
        .runtime
        .poll_interval
        .map(|d| humantime::format_duration(d).to_string());

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Server: {}", config.server.address);
            if !config.server.domain.is_empty() {
                println!("  Domain: {}", config.server.domain);
            }
            println!("  Clsid: {}", config.server.clsid);
            println!("  Connect timeout: {}", humantime::format_duration(config.server.timeout));
            println!("  Group: {}", config.reader.group_name);
            println!("  Items: {}", config.reader.items.len());
            println!("  Use cache: {}", config.reader.use_cache);
            println!("  Emit on change: {}", config.reader.emit_on_change);
            println!(
                "  Reconnect delay: {}",
                humantime::format_duration(config.reader.reconnect_delay)
            );
            println!("  Poll interval: {}", poll.as_deref().unwrap_or("disabled"));
            println!("  Simulated items: {}", config.simulator.items.len());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", to_json(&config)?);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let mut output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "address": config.server.address,
                    "clsid": config.server.clsid,
                    "group": config.reader.group_name,
                    "item_count": config.reader.items.len(),
                    "use_cache": config.reader.use_cache,
                    "emit_on_change": config.reader.emit_on_change,
                    "tag_policy": config.reader.tag_policy,
                    "poll_interval": poll,
                    "simulated_item_count": config.simulator.items.len(),
                },
                "warnings": warnings,
            });
            if args.show_config {
                output["config"] = serde_json::to_value(&config)
                    .map_err(|e| BinError::runtime(format!("Failed to serialize config: {}", e)))?;
            }

            let rendered = if args.format == OutputFormat::Json {
                to_json(&output)?
            } else {
                serde_yaml::to_string(&output)
                    .map_err(|e| BinError::runtime(format!("Failed to render YAML: {}", e)))?
            };
            println!("{}", rendered.trim_end());
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("Failed to serialize: {}", e)))
}

/// Collects the problems that do not make a configuration invalid.
pub(crate) fn collect_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.reader.items.is_empty() {
        warnings.push("No items configured; group reads produce no output".to_string());
    }

    if config
        .server
        .password
        .as_ref()
        .map_or(true, |p| p.expose().is_empty())
    {
        warnings.push("No password configured".to_string());
    }

    if config.reader.emit_on_change && config.runtime.poll_interval.is_none() {
        warnings.push("emit_on_change is set but no poll interval is configured".to_string());
    }

    let clsid = config.server.clsid.trim_start_matches('{').trim_end_matches('}');
    if !clsid.eq_ignore_ascii_case(SimulatedDataSource::CLSID) {
        warnings.push(format!(
            "clsid {} is not served by the simulated data source",
            config.server.clsid
        ));
    }

    if !config.simulator.items.is_empty() {
        let known: HashSet<_> = config.simulator.items.iter().map(|i| &i.id).collect();
        for item in config.reader.items.iter().filter(|i| !known.contains(i)) {
            warnings.push(format!("Item '{}' is not in the simulated address space", item));
        }
    }

    warnings
}

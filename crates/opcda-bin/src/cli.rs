// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command line of the `opcda` binary. Without a subcommand it runs the
//! reader.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use opcda_config::{LogLevel, LoggingConfig};

/// opcda - OPC DA data-acquisition reader
///
/// Connects to an OPC DA server, reads a fixed group of items or ad-hoc
/// tags on demand and prints one JSON line per acquisition.
#[derive(Parser, Debug)]
#[command(
    name = "opcda",
    author = "Sylvex <contact@sylvex.io>",
    version = opcda_core::VERSION,
    about = "OPC DA data-acquisition reader",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// YAML, TOML or JSON configuration file
    #[arg(
        short,
        long,
        default_value = "opcda.yaml",
        env = "OPCDA_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format; defaults to the config file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do; `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The selected subcommand with `run` filled in.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run(RunArgs::default()))
    }

    /// Log directive to install: `-q`/`-v`, then `--log-level`, then the file.
    pub fn effective_log_level(&self, logging: Option<&LoggingConfig>) -> String {
        if self.quiet {
            return LogLevel::Error.as_str().to_string();
        }
        if self.verbose {
            return LogLevel::Debug.as_str().to_string();
        }
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        logging
            .map(|l| l.level)
            .unwrap_or_default()
            .as_str()
            .to_string()
    }

    /// `--log-format` if given, else the file's format.
    pub fn effective_log_format(&self, logging: Option<&LoggingConfig>) -> LogFormat {
        self.log_format
            .or_else(|| logging.map(|l| l.format.into()))
            .unwrap_or_default()
    }
}

/// Subcommands of `opcda`.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Connect and acquire until stopped
    ///
    /// The group is read every poll interval and each stdin line is handled
    /// as a JSON input event. Every output message is one JSON line on stdout.
    Run(RunArgs),

    /// Check the configuration file without connecting
    Validate(ValidateArgs),

    /// List the items of the configured server
    Browse(BrowseArgs),

    /// Print component versions
    Version,
}

/// Options of `opcda run`.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the poll interval of the config file (e.g. "500ms", "2s")
    #[arg(long, value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Do not read input events from stdin
    #[arg(long)]
    pub no_stdin: bool,
}

/// Options of `opcda validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Print the effective configuration, secrets masked
    #[arg(short, long)]
    pub show_config: bool,

    /// How to print the report
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Fail on warnings too
    #[arg(long)]
    pub strict: bool,
}

/// Options of `opcda browse`.
#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    /// How to print the item ids
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Layout of log lines on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Full text lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Text without targets
    Compact,
}

impl From<opcda_config::LogFormat> for LogFormat {
    fn from(format: opcda_config::LogFormat) -> Self {
        match format {
            opcda_config::LogFormat::Text => LogFormat::Text,
            opcda_config::LogFormat::Json => LogFormat::Json,
            opcda_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Format of `validate` and `browse` reports on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain lines
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// YAML
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["opcda"]);
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
        assert_eq!(cli.config, PathBuf::from("opcda.yaml"));
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from(["opcda", "run", "--poll-interval", "250ms", "--no-stdin"]);
        match cli.effective_command() {
            Commands::Run(args) => {
                assert_eq!(args.poll_interval, Some(Duration::from_millis(250)));
                assert!(args.no_stdin);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(Cli::try_parse_from(["opcda", "run", "--poll-interval", "0s"]).is_err());
    }

    #[test]
    fn test_validate_args() {
        let cli = Cli::parse_from(["opcda", "-c", "plant.toml", "validate", "-s", "-f", "json"]);
        assert_eq!(cli.config, PathBuf::from("plant.toml"));
        match cli.effective_command() {
            Commands::Validate(args) => {
                assert!(args.show_config);
                assert_eq!(args.format, OutputFormat::Json);
                assert!(!args.strict);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_precedence() {
        let logging = LoggingConfig {
            level: LogLevel::Warn,
            ..Default::default()
        };

        let cli = Cli::parse_from(["opcda", "version"]);
        assert_eq!(cli.effective_log_level(Some(&logging)), "warn");
        assert_eq!(cli.effective_log_level(None), "info");

        let cli = Cli::parse_from(["opcda", "-l", "trace", "version"]);
        assert_eq!(cli.effective_log_level(Some(&logging)), "trace");

        let cli = Cli::parse_from(["opcda", "-q", "-l", "trace", "version"]);
        assert_eq!(cli.effective_log_level(Some(&logging)), "error");

        let cli = Cli::parse_from(["opcda", "-v", "version"]);
        assert_eq!(cli.effective_log_level(None), "debug");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["opcda", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_log_format_from_config() {
        let logging = LoggingConfig {
            format: opcda_config::LogFormat::Json,
            ..Default::default()
        };

        let cli = Cli::parse_from(["opcda"]);
        assert_eq!(cli.effective_log_format(Some(&logging)), LogFormat::Json);

        let cli = Cli::parse_from(["opcda", "--log-format", "compact"]);
        assert_eq!(cli.effective_log_format(Some(&logging)), LogFormat::Compact);
    }
}

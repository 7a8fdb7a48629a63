// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! ```text
//! AppConfig
//! ├── server: ServerConfig
//! ├── reader: ReaderConfig
//! ├── runtime: RuntimeConfig
//! ├── logging: LoggingConfig
//! └── simulator: SimulatorConfig
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use opcda_client::{Credentials, ReaderConfig, ServerSettings};
use opcda_core::{DaValue, ItemId};

use crate::error::{ConfigError, ConfigResult};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Quality code given to simulated items that do not set one.
pub const DEFAULT_SIMULATED_QUALITY: i64 = 192;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration of the `opcda` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// The server to connect to.
    #[serde(default)]
    pub server: ServerConfig,

    /// What to acquire.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// How the binary drives the reader.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Address space of the simulated server.
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl AppConfig {
    /// Validates the whole configuration.
    ///
    /// Server and reader problems surface with the same messages the reader
    /// reports at construction.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.to_settings().validate()?;
        self.reader.validate()?;
        self.runtime.validate()?;
        self.simulator.validate()?;
        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Server section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host name or IP address.
    #[serde(default)]
    pub address: String,

    /// Windows domain of the account.
    #[serde(default)]
    pub domain: String,

    /// Account name.
    #[serde(default)]
    pub username: String,

    /// Account password.
    #[serde(default)]
    pub password: Option<SecretValue>,

    /// Class identifier of the server.
    #[serde(default)]
    pub clsid: String,

    /// Connect timeout.
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            domain: String::new(),
            username: String::new(),
            password: None,
            clsid: String::new(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Converts to the settings the reader consumes.
    pub fn to_settings(&self) -> ServerSettings {
        ServerSettings {
            address: self.address.clone(),
            domain: self.domain.clone(),
            credentials: Credentials::new(
                self.username.clone(),
                self.password
                    .as_ref()
                    .map(|p| p.expose().to_string())
                    .unwrap_or_default(),
            ),
            clsid: self.clsid.clone(),
            timeout: self.timeout,
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Runtime section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Period of automatic group reads. None disables polling.
    #[serde(default, with = "duration_serde::option")]
    pub poll_interval: Option<Duration>,
}

impl RuntimeConfig {
    /// Validates the runtime section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::validation(
                "runtime.poll_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable.
    #[default]
    Text,
    /// Single line per event.
    Compact,
    /// JSON structured logging.
    Json,
}

// =============================================================================
// Simulator Configuration
// =============================================================================

/// Simulator section.
///
/// An empty item list leaves the address space open: every well-formed
/// identifier is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Items of the address space.
    #[serde(default)]
    pub items: Vec<SimulatedItem>,
}

impl SimulatorConfig {
    /// Validates the simulator section.
    pub fn validate(&self) -> ConfigResult<()> {
        for (i, item) in self.items.iter().enumerate() {
            if item.id.is_blank() {
                return Err(ConfigError::validation(
                    format!("simulator.items[{}].id", i),
                    "must not be empty",
                ));
            }
            if !(0..=255).contains(&item.quality) {
                return Err(ConfigError::validation(
                    format!("simulator.items[{}].quality", i),
                    "must be within 0..=255",
                ));
            }
        }
        Ok(())
    }
}

/// One simulated item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedItem {
    /// Item identifier.
    pub id: ItemId,

    /// Initial value.
    #[serde(default)]
    pub value: DaValue,

    /// Raw quality code.
    #[serde(default = "default_simulated_quality")]
    pub quality: i64,
}

fn default_simulated_quality() -> i64 {
    DEFAULT_SIMULATED_QUALITY
}

// =============================================================================
// Secret Value
// =============================================================================

/// A secret that never prints or serializes in clear.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the clear value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretValue").field(&"***").finish()
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

// =============================================================================
// Duration serde
// =============================================================================

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            duration
                .map(|d| humantime::format_duration(d).to_string())
                .serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcda_core::ConfigurationError;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.address = "10.0.0.5".into();
        config.server.username = "operator".into();
        config.server.password = Some(SecretValue::new("secret"));
        config.server.clsid = "F8582CF2-88FB-11D0-B850-00C0F0104305".into();
        config
    }

    #[test]
    fn test_app_config_default_is_incomplete() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Settings(ConfigurationError::MissingServer)
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = valid();
        config.server.username.clear();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Failed to load credentials!"
        );
    }

    #[test]
    fn test_to_settings() {
        let settings = valid().server.to_settings();
        assert_eq!(settings.credentials.password, "secret");
        assert_eq!(settings.timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = valid();
        config.runtime.poll_interval = Some(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_simulated_quality_range() {
        let mut config = valid();
        config.simulator.items.push(SimulatedItem {
            id: ItemId::new("A"),
            value: DaValue::Int(1),
            quality: 300,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_value_redacted() {
        let secret = SecretValue::new("hunter2");
        assert_eq!(secret.to_string(), "***");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"***\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }
}

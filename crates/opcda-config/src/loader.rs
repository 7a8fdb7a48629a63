// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reading [`AppConfig`] from disk or from a string.
//!
//! Text goes through placeholder expansion (`${VAR}`, `${VAR:default}`)
//! before it is parsed. After parsing, `<PREFIX>_*` variables replace the
//! server credentials and the log level, and the result is validated.
//!
//! ```text
//! OPCDA_SERVER_ADDRESS=10.0.0.5
//! OPCDA_SERVER_DOMAIN=PLANT
//! OPCDA_USERNAME=operator
//! OPCDA_PASSWORD=secret
//! OPCDA_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{AppConfig, LogLevel, SecretValue};

/// Prefix of override variables unless another is set.
pub const DEFAULT_ENV_PREFIX: &str = "OPCDA";

/// How a loader treats the process environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    use_env: bool,
}

impl ConfigLoader {
    /// `OPCDA_*` overrides and placeholder expansion both enabled.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            use_env: true,
        }
    }

    /// Reads overrides from `<prefix>_*` instead.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Turns placeholder expansion and overrides on or off together.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Reads `path`, picking the format from its extension.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::file_not_found(path));
        }
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let config = self
            .load_from_str(&text, format)
            .map_err(|e| e.at(path))?;
        info!(
            path = %path.display(),
            address = %config.server.address,
            items = config.reader.items.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses, overrides and validates `text`.
    pub fn load_from_str(&self, text: &str, format: ConfigFormat) -> ConfigResult<AppConfig> {
        let mut config: AppConfig = if self.use_env {
            format.parse(&resolve_env_placeholders(text))?
        } else {
            format.parse(text)?
        };
        if self.use_env {
            self.apply_overrides(&mut config)?;
        }
        config.validate()?;
        debug!(simulated = config.simulator.items.len(), "Configuration validated");
        Ok(config)
    }

    fn lookup(&self, suffix: &str) -> Option<(String, String)> {
        let name = format!("{}_{}", self.env_prefix, suffix);
        env::var(&name).ok().map(|value| (name, value))
    }

    fn apply_overrides(&self, config: &mut AppConfig) -> ConfigResult<()> {
        let server = &mut config.server;
        for (suffix, slot) in [
            ("SERVER_ADDRESS", &mut server.address),
            ("SERVER_DOMAIN", &mut server.domain),
            ("USERNAME", &mut server.username),
        ] {
            if let Some((name, value)) = self.lookup(suffix) {
                debug!(var = %name, "Override applied");
                *slot = value;
            }
        }
        if let Some((_, value)) = self.lookup("PASSWORD") {
            server.password = Some(SecretValue::new(value));
        }
        if let Some((name, value)) = self.lookup("LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(name, "expected trace, debug, info, warn or error")
            })?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` or `.yml`, read through the `config` crate.
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Picks the format from the (case-insensitive) extension of `path`.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ConfigError::unsupported_format("<none>"));
        };
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::unsupported_format(ext)),
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> ConfigResult<T> {
        match self {
            Self::Toml => toml::from_str(text).map_err(ConfigError::syntax),
            Self::Json => serde_json::from_str(text).map_err(ConfigError::syntax),
            Self::Yaml => config::Config::builder()
                .add_source(config::File::from_str(text, config::FileFormat::Yaml))
                .build()
                .and_then(|c| c.try_deserialize())
                .map_err(ConfigError::syntax),
        }
    }
}

/// Expands `${VAR}` and `${VAR:default}` in `text`.
///
/// Unset variables without a default stay as written. An unterminated
/// `${` ends expansion.
pub fn resolve_env_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 2..];
        let Some(close) = body.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let token = &body[..close];
        let (name, fallback) = token
            .split_once(':')
            .map_or((token, None), |(n, d)| (n, Some(d)));
        match env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => match fallback {
                Some(fallback) => out.push_str(fallback),
                None => {
                    warn!(var = name, "Placeholder refers to an unset variable");
                    out.push_str(&rest[open..open + close + 3]);
                }
            },
        }
        rest = &body[close + 1..];
    }
    out.push_str(rest);
    out
}

/// [`ConfigLoader::load`] with the default loader.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
    ConfigLoader::new().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn sample_yaml() -> &'static str {
        r#"
server:
  address: 10.0.0.5
  username: operator
  password: secret
  clsid: F8582CF2-88FB-11D0-B850-00C0F0104305
  timeout: 2s

reader:
  group_name: line-1
  items:
    - Tag1
    - Tag2
  emit_on_change: true

runtime:
  poll_interval: 500ms

logging:
  level: debug
  format: json
"#
    }

    fn loader() -> ConfigLoader {
        ConfigLoader::new().with_env_prefix("OPCDA_LOADER_TEST")
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(sample_yaml().as_bytes()).unwrap();

        let config = loader().load(file.path()).unwrap();
        assert_eq!(config.server.address, "10.0.0.5");
        assert_eq!(config.server.timeout, Duration::from_secs(2));
        assert_eq!(config.reader.group_name, "line-1");
        assert_eq!(config.reader.items.len(), 2);
        assert!(config.reader.emit_on_change);
        assert_eq!(config.reader.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.runtime.poll_interval, Some(Duration::from_millis(500)));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
[server]
address = "host"
username = "u"
clsid = "F8582CF2-88FB-11D0-B850-00C0F0104305"

[reader]
items = ["A"]
tag_policy = "transient"
"#;
        let config = loader().load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(
            config.reader.tag_policy,
            opcda_client::TagHandlePolicy::Transient
        );
        assert!(config.server.password.is_none());
    }

    #[test]
    fn test_validation_runs_on_load() {
        let json = r#"{"server": {"address": "", "username": "u", "clsid": "x"}}"#;
        let err = loader().load_from_str(json, ConfigFormat::Json).unwrap_err();
        assert_eq!(err.to_string(), "Please select a server.");
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(br#"{"bogus": 1}"#).unwrap();
        let err = loader().load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("opcda.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("opcda.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("opcda.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("opcda")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        assert_eq!(
            resolve_env_placeholders("value: ${OPCDA_NONEXISTENT_VAR:fallback}"),
            "value: fallback"
        );
        assert_eq!(
            resolve_env_placeholders("value: ${OPCDA_NONEXISTENT_VAR}!"),
            "value: ${OPCDA_NONEXISTENT_VAR}!"
        );
        assert_eq!(resolve_env_placeholders("open ${brace"), "open ${brace");
    }

    #[test]
    fn test_env_placeholder_resolved() {
        env::set_var("OPCDA_PLACEHOLDER_TEST_HOST", "plc-7");
        assert_eq!(
            resolve_env_placeholders("a: ${OPCDA_PLACEHOLDER_TEST_HOST:x} b: ${OPCDA_PLACEHOLDER_TEST_HOST}"),
            "a: plc-7 b: plc-7"
        );
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("OPCDA_OVERRIDE_TEST_SERVER_ADDRESS", "override-host");
        env::set_var("OPCDA_OVERRIDE_TEST_PASSWORD", "from-env");
        let config = ConfigLoader::new()
            .with_env_prefix("OPCDA_OVERRIDE_TEST")
            .load_from_str(sample_yaml(), ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.server.address, "override-host");
        assert_eq!(
            config.server.password.as_ref().map(|p| p.expose()),
            Some("from-env")
        );
    }

    #[test]
    fn test_invalid_log_level_override() {
        env::set_var("OPCDA_LEVEL_TEST_LOG_LEVEL", "loud");
        let err = ConfigLoader::new()
            .with_env_prefix("OPCDA_LEVEL_TEST")
            .load_from_str(sample_yaml(), ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_disabled_env_keeps_placeholders() {
        env::set_var("OPCDA_DISABLED_TEST_SERVER_ADDRESS", "ignored");
        let yaml = sample_yaml().replace("10.0.0.5", "${OPCDA_DISABLED_TEST_HOST:plc-9}");
        let config = ConfigLoader::new()
            .with_env_prefix("OPCDA_DISABLED_TEST")
            .with_env_vars(false)
            .load_from_str(&yaml, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.server.address, "${OPCDA_DISABLED_TEST_HOST:plc-9}");
    }

    #[test]
    fn test_file_not_found() {
        let result = loader().load("/nonexistent/path/opcda.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! - `test_load_*`: file loading in every supported format
//! - `test_env_*`: environment placeholders and overrides
//! - `test_invalid_*`: validation failures
//! - `test_config_*`: configuration driving a reader

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use opcda_client::{OpcDaReader, SimulatedDataSource, TagHandlePolicy, TracingReporter};
use opcda_config::{load_config, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel};
use opcda_core::{ConfigurationError, ConnectionState, DaValue, ItemId};
use opcda_tests::common::unique_env_prefix;
use opcda_tests::prelude::*;

fn write_config(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("opcda-")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_full_schema() {
    let file = write_config(&ConfigFixtures::yaml(), ".yaml");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.server.address, "10.0.0.5");
    assert_eq!(config.server.domain, "PLANT");
    assert_eq!(config.server.password.as_ref().unwrap().expose(), "secret");
    assert_eq!(config.server.timeout, Duration::from_secs(2));

    assert_eq!(config.reader.group_name, "line-1");
    assert_eq!(config.reader.items, tags(&["Tag1", "Tag2"]));
    assert!(config.reader.use_cache);
    assert!(config.reader.emit_on_change);
    assert_eq!(config.reader.reconnect_delay, Duration::from_millis(500));
    assert_eq!(config.reader.tag_policy, TagHandlePolicy::Transient);

    assert_eq!(config.runtime.poll_interval, Some(Duration::from_secs(1)));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);

    let items = &config.simulator.items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, ItemId::new("Tag1"));
    assert_eq!(items[0].value, DaValue::Int(10));
    assert_eq!(items[0].quality, 192);
    assert_eq!(items[1].value, DaValue::Float(20.5));
    assert_eq!(items[1].quality, 64);
}

#[test]
fn test_load_toml_applies_defaults() {
    let file = write_config(&ConfigFixtures::toml(), ".toml");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.server.username, "operator");
    assert_eq!(config.server.timeout, ServerFixtures::TIMEOUT);
    assert_eq!(config.reader.items, tags(&["Tag1"]));
    assert!(!config.reader.use_cache);
    assert_eq!(config.reader.tag_policy, TagHandlePolicy::Cached);
    assert!(config.runtime.poll_interval.is_none());
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_load_json() {
    let file = write_config(&ConfigFixtures::json(), ".json");
    let config = load_config(file.path()).unwrap();

    assert!(config.server.password.is_none());
    assert_eq!(config.reader.items.len(), 2);
}

#[test]
fn test_load_missing_file() {
    let err = load_config("/nonexistent/opcda.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_load_unsupported_extension() {
    let file = write_config("server: {}", ".ini");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_load_rejects_unknown_fields() {
    let file = write_config("server:\n  address: host\n  port: 135\n", ".yaml");
    assert!(load_config(file.path()).is_err());
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_env_overrides() {
    let prefix = unique_env_prefix("overrides");
    std::env::set_var(format!("{prefix}_SERVER_ADDRESS"), "10.9.9.9");
    std::env::set_var(format!("{prefix}_PASSWORD"), "from-env");
    std::env::set_var(format!("{prefix}_LOG_LEVEL"), "warn");

    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_from_str(&ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.server.address, "10.9.9.9");
    assert_eq!(config.server.password.as_ref().unwrap().expose(), "from-env");
    assert_eq!(config.logging.level, LogLevel::Warn);

    // Disabled overrides leave the file values alone.
    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .with_env_vars(false)
        .load_from_str(&ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(config.server.address, "10.0.0.5");
}

#[test]
fn test_env_invalid_log_level() {
    let prefix = unique_env_prefix("level");
    std::env::set_var(format!("{prefix}_LOG_LEVEL"), "loud");

    let err = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_from_str(&ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
}

#[test]
fn test_env_placeholders() {
    let prefix = unique_env_prefix("placeholder");
    let var = format!("{prefix}_HOST");
    std::env::set_var(&var, "plc-7");

    let yaml = format!(
        "server:\n  address: ${{{var}}}\n  username: ${{{prefix}_UNSET:operator}}\n  clsid: {}\n",
        SimulatedDataSource::CLSID
    );
    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_from_str(&yaml, ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.server.address, "plc-7");
    assert_eq!(config.server.username, "operator");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_invalid_missing_server() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("server:\n  username: operator\n  clsid: x\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Settings(ConfigurationError::MissingServer)
    ));
    assert_eq!(err.to_string(), "Please select a server.");
}

#[test]
fn test_invalid_missing_credentials() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("server:\n  address: host\n  clsid: x\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Settings(ConfigurationError::MissingCredentials)
    ));
}

#[test]
fn test_invalid_sections() {
    let base = "server:\n  address: host\n  username: operator\n  clsid: x\n";
    let cases = [
        "reader:\n  items: [Tag1, \" \"]\n",
        "reader:\n  group_name: \"\"\n",
        "runtime:\n  poll_interval: 0s\n",
        "simulator:\n  items:\n    - id: Tag1\n      quality: 300\n",
    ];

    for case in cases {
        let content = format!("{base}{case}");
        let result = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(&content, ConfigFormat::Yaml);
        assert!(result.is_err(), "accepted:\n{content}");
    }
}

// =============================================================================
// Configuration Driving a Reader
// =============================================================================

#[tokio::test]
async fn test_config_drives_simulated_reader() {
    let config = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(&ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap();

    let source = Arc::new(SimulatedDataSource::with_items(Vec::<(ItemId, DaValue)>::new()));
    for item in &config.simulator.items {
        source.set_value(item.id.clone(), item.value.clone(), item.quality);
    }

    let reader = OpcDaReader::new(
        source,
        config.server.to_settings(),
        config.reader.clone(),
        Arc::new(TracingReporter),
    )
    .unwrap();
    reader.start().await.unwrap();
    assert_eq!(reader.state(), ConnectionState::Ready);

    let outcome = reader.handle_payload("{}").await.unwrap();
    let output = outcome.output().expect("output expected");
    assert_eq!(item_ids(output), vec!["Tag1", "Tag2"]);
    output.payload[1].assert_reading("Tag2", &DaValue::Float(20.5));

    reader.shutdown().await;
    assert_eq!(reader.state(), ConnectionState::Disconnected);
}

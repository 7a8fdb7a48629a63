// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built settings and configuration files for consistent testing.

use std::time::Duration;

use opcda_client::{ReaderConfig, ServerSettings, SimulatedDataSource, TagHandlePolicy};
use opcda_core::ItemId;

// =============================================================================
// Server Fixtures
// =============================================================================

/// Fixture providing server settings.
pub struct ServerFixtures;

impl ServerFixtures {
    /// Connect timeout used by the fixtures.
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Settings for a plant server.
    pub fn settings() -> ServerSettings {
        ServerSettings {
            address: "10.0.0.5".to_string(),
            domain: "PLANT".to_string(),
            credentials: opcda_client::Credentials::new("operator", "secret"),
            clsid: SimulatedDataSource::CLSID.to_string(),
            timeout: Self::TIMEOUT,
        }
    }

    /// Settings with a custom connect timeout.
    pub fn with_timeout(timeout: Duration) -> ServerSettings {
        ServerSettings {
            timeout,
            ..Self::settings()
        }
    }
}

// =============================================================================
// Reader Fixtures
// =============================================================================

/// Fixture providing reader configurations.
pub struct ReaderFixtures;

impl ReaderFixtures {
    /// Reconnect delay used by the fixtures.
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

    /// A group of the given items reading from the device.
    pub fn group(items: &[&str]) -> ReaderConfig {
        ReaderConfig {
            group_name: "test-group".to_string(),
            items: items.iter().map(|i| ItemId::new(*i)).collect(),
            use_cache: false,
            emit_on_change: false,
            reconnect_delay: Self::RECONNECT_DELAY,
            tag_policy: TagHandlePolicy::Cached,
        }
    }

    /// The two-item group of the end-to-end scenarios.
    pub fn two_tags() -> ReaderConfig {
        Self::group(&["Tag1", "Tag2"])
    }

    /// The two-item group in change-only mode.
    pub fn two_tags_on_change() -> ReaderConfig {
        ReaderConfig {
            emit_on_change: true,
            ..Self::two_tags()
        }
    }

    /// A group without items, for ad-hoc reads.
    pub fn ad_hoc(policy: TagHandlePolicy) -> ReaderConfig {
        ReaderConfig {
            tag_policy: policy,
            ..Self::group(&[])
        }
    }
}

/// Builds an owned tag list.
pub fn tags(names: &[&str]) -> Vec<ItemId> {
    names.iter().map(|n| ItemId::new(*n)).collect()
}

// =============================================================================
// Config File Fixtures
// =============================================================================

/// Fixture providing configuration file contents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML configuration.
    pub fn yaml() -> String {
        format!(
            r#"
server:
  address: 10.0.0.5
  domain: PLANT
  username: operator
  password: secret
  clsid: "{clsid}"
  timeout: 2s
reader:
  group_name: line-1
  items: [Tag1, Tag2]
  use_cache: true
  emit_on_change: true
  reconnect_delay: 500ms
  tag_policy: transient
runtime:
  poll_interval: 1s
logging:
  level: debug
  format: json
simulator:
  items:
    - id: Tag1
      value: 10
    - id: Tag2
      value: 20.5
      quality: 64
"#,
            clsid = SimulatedDataSource::CLSID
        )
    }

    /// The same server in TOML.
    pub fn toml() -> String {
        format!(
            r#"
[server]
address = "10.0.0.5"
username = "operator"
password = "secret"
clsid = "{clsid}"

[reader]
items = ["Tag1"]
"#,
            clsid = SimulatedDataSource::CLSID
        )
    }

    /// The same server in JSON.
    pub fn json() -> String {
        serde_json::json!({
            "server": {
                "address": "10.0.0.5",
                "username": "operator",
                "clsid": SimulatedDataSource::CLSID,
            },
            "reader": { "items": ["Tag1", "Tag2"] },
        })
        .to_string()
    }
}

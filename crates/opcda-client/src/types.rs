// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime settings of a reader instance.
//!
//! [`ServerSettings`] describes how to reach the OPC DA server and
//! [`ReaderConfig`] describes what to read from it. Both are validated at
//! construction; a failure there is reported once and never retried.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use opcda_client::types::{ReaderConfig, ServerSettings};
//!
//! let server = ServerSettings::builder()
//!     .address("192.168.0.20")
//!     .domain("PLANT")
//!     .credentials("operator", "secret")
//!     .clsid("F8582CF2-88FB-11D0-B850-00C0F0104305")
//!     .timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! let reader = ReaderConfig::builder()
//!     .group_name("line-1")
//!     .items(["Random.Int4", "Random.Real8"])
//!     .emit_on_change(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(server.timeout, Duration::from_secs(5));
//! assert_eq!(reader.items.len(), 2);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use opcda_core::{ConfigurationError, ItemId};

// =============================================================================
// Credentials
// =============================================================================

/// Username and password for the DCOM session.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `true` if no username is set.
    pub fn is_empty(&self) -> bool {
        self.username.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// ServerSettings
// =============================================================================

/// How to reach the OPC DA server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host name or IP address.
    pub address: String,

    /// Windows domain of the account.
    #[serde(default)]
    pub domain: String,

    /// Account used for the session.
    #[serde(default)]
    pub credentials: Credentials,

    /// Class identifier of the server implementation.
    pub clsid: String,

    /// Upper bound for the whole connect sequence.
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

impl ServerSettings {
    /// Creates a builder.
    pub fn builder() -> ServerSettingsBuilder {
        ServerSettingsBuilder::default()
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.address.trim().is_empty() {
            return Err(ConfigurationError::MissingServer);
        }
        if self.credentials.is_empty() {
            return Err(ConfigurationError::MissingCredentials);
        }
        if self.clsid.trim().is_empty() {
            return Err(ConfigurationError::invalid_field("clsid", "must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigurationError::invalid_field(
                "timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ServerSettings`].
#[derive(Debug, Default)]
pub struct ServerSettingsBuilder {
    address: Option<String>,
    domain: Option<String>,
    credentials: Option<Credentials>,
    clsid: Option<String>,
    timeout: Option<Duration>,
}

impl ServerSettingsBuilder {
    /// Sets the server address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the credential pair.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the clsid.
    pub fn clsid(mut self, clsid: impl Into<String>) -> Self {
        self.clsid = Some(clsid.into());
        self
    }

    /// Sets the connect timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds and validates the settings.
    pub fn build(self) -> Result<ServerSettings, ConfigurationError> {
        let settings = ServerSettings {
            address: self.address.ok_or(ConfigurationError::MissingServer)?,
            domain: self.domain.unwrap_or_default(),
            credentials: self.credentials.ok_or(ConfigurationError::MissingCredentials)?,
            clsid: self.clsid.unwrap_or_default(),
            timeout: self.timeout.unwrap_or_else(default_connect_timeout),
        };
        settings.validate()?;
        Ok(settings)
    }
}

// =============================================================================
// ReaderConfig
// =============================================================================

/// How ad-hoc tag handles are kept between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagHandlePolicy {
    /// Keep handles cached until a read against them fails.
    #[default]
    Cached,
    /// Remove handles added for a request once it has been read.
    Transient,
}

/// What a reader instance acquires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Name of the server-side group.
    #[serde(default = "default_group_name")]
    pub group_name: String,

    /// Items of the fixed group, in output order.
    #[serde(default)]
    pub items: Vec<ItemId>,

    /// Read from the server cache instead of the device.
    #[serde(default)]
    pub use_cache: bool,

    /// Emit only readings whose value changed since the previous group read.
    #[serde(default)]
    pub emit_on_change: bool,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay")]
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,

    /// Handle policy for ad-hoc tag reads.
    #[serde(default)]
    pub tag_policy: TagHandlePolicy,
}

fn default_group_name() -> String {
    "opcda-reader".to_string()
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(3)
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            group_name: default_group_name(),
            items: Vec::new(),
            use_cache: false,
            emit_on_change: false,
            reconnect_delay: default_reconnect_delay(),
            tag_policy: TagHandlePolicy::default(),
        }
    }
}

impl ReaderConfig {
    /// Creates a builder.
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.group_name.trim().is_empty() {
            return Err(ConfigurationError::invalid_field(
                "group_name",
                "must not be empty",
            ));
        }
        if let Some(index) = self.items.iter().position(ItemId::is_blank) {
            return Err(ConfigurationError::invalid_field(
                format!("items[{}]", index),
                "item identifier must not be empty",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ReaderConfig`].
#[derive(Debug, Default)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    /// Sets the group name.
    pub fn group_name(mut self, name: impl Into<String>) -> Self {
        self.config.group_name = name.into();
        self
    }

    /// Sets the fixed item list.
    pub fn items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        self.config.items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Selects cache or device reads.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.config.use_cache = use_cache;
        self
    }

    /// Enables change-only output.
    pub fn emit_on_change(mut self, enabled: bool) -> Self {
        self.config.emit_on_change = enabled;
        self
    }

    /// Sets the reconnect delay.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Sets the tag handle policy.
    pub fn tag_policy(mut self, policy: TagHandlePolicy) -> Self {
        self.config.tag_policy = policy;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ReaderConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

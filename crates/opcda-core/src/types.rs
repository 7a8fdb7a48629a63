// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types.
//!
//! - [`ItemId`]: name of a data point in the server's address space
//! - [`ServerHandle`]: session-scoped reference to an added item
//! - [`DaValue`]: the value carried by a reading
//! - [`ReadResult`]: what the remote side returns for one item
//! - [`ClassifiedReading`]: a `ReadResult` with its quality band

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::StatusCode;
use crate::quality::{classify, QualityBand};

// =============================================================================
// Identifiers
// =============================================================================

/// An item identifier, e.g. `"Random.Int4"`.
///
/// Stable across sessions and used as the handle cache key.
///
/// # Examples
///
/// ```
/// use opcda_core::types::ItemId;
///
/// let id = ItemId::new("Random.Real8");
/// assert_eq!(id.as_str(), "Random.Real8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item identifier.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for an empty or whitespace-only identifier.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Server-assigned handle of an item inside a group.
///
/// Only valid for the session that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerHandle(u32);

impl ServerHandle {
    /// Wraps a raw handle.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a read takes its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Read through to the device.
    #[default]
    Device,
    /// Server's last cached value.
    Cache,
}

impl DataSource {
    /// Selects the source from a "use cache" flag.
    #[inline]
    pub fn from_use_cache(use_cache: bool) -> Self {
        if use_cache {
            DataSource::Cache
        } else {
            DataSource::Device
        }
    }
}

// =============================================================================
// DaValue
// =============================================================================

/// The value of a reading.
///
/// Serializes untagged so that output messages carry plain JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum DaValue {
    /// `VT_EMPTY` / `VT_NULL`.
    #[default]
    Null,
    /// `VT_BOOL`.
    Bool(bool),
    /// Signed integer types.
    Int(i64),
    /// Unsigned integer types.
    UInt(u64),
    /// `VT_R4` / `VT_R8`.
    Float(f64),
    /// `VT_BSTR`.
    String(String),
    /// `VT_ARRAY`.
    Array(Vec<DaValue>),
}

impl DaValue {
    /// Returns `true` for [`DaValue::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, DaValue::Null)
    }

    /// Returns the value as `f64` for numeric variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DaValue::Int(v) => Some(*v as f64),
            DaValue::UInt(v) => Some(*v as f64),
            DaValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i64` for integer variants that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DaValue::Int(v) => Some(*v),
            DaValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for DaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaValue::Null => write!(f, "null"),
            DaValue::Bool(v) => write!(f, "{}", v),
            DaValue::Int(v) => write!(f, "{}", v),
            DaValue::UInt(v) => write!(f, "{}", v),
            DaValue::Float(v) => write!(f, "{}", v),
            DaValue::String(v) => write!(f, "{}", v),
            DaValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for DaValue {
    fn from(v: bool) -> Self {
        DaValue::Bool(v)
    }
}

impl From<i32> for DaValue {
    fn from(v: i32) -> Self {
        DaValue::Int(v.into())
    }
}

impl From<i64> for DaValue {
    fn from(v: i64) -> Self {
        DaValue::Int(v)
    }
}

impl From<f64> for DaValue {
    fn from(v: f64) -> Self {
        DaValue::Float(v)
    }
}

impl From<&str> for DaValue {
    fn from(v: &str) -> Self {
        DaValue::String(v.to_string())
    }
}

impl From<String> for DaValue {
    fn from(v: String) -> Self {
        DaValue::String(v)
    }
}

// =============================================================================
// Readings
// =============================================================================

/// Raw result of reading one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// The item that was read.
    pub item_id: ItemId,
    /// The value as reported.
    pub value: DaValue,
    /// Raw 8-bit quality code.
    pub quality: i64,
    /// Per-item status code.
    pub error_code: StatusCode,
    /// Server timestamp of the value.
    pub timestamp: DateTime<Utc>,
}

impl ReadResult {
    /// Creates a result with a success error code.
    pub fn new(
        item_id: impl Into<ItemId>,
        value: impl Into<DaValue>,
        quality: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            value: value.into(),
            quality,
            error_code: StatusCode::OK,
            timestamp,
        }
    }

    /// Sets the per-item error code.
    pub fn with_error_code(mut self, code: StatusCode) -> Self {
        self.error_code = code;
        self
    }

    /// Classifies this result.
    pub fn classify(self) -> ClassifiedReading {
        ClassifiedReading {
            quality_band: classify(self.quality),
            item_id: self.item_id,
            value: self.value,
            error_code: self.error_code,
            timestamp: self.timestamp,
        }
    }
}

/// A reading with its quality band, as emitted in output messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedReading {
    /// The item that was read.
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
    /// The value as reported.
    pub value: DaValue,
    /// Quality band derived from the raw code.
    pub quality_band: QualityBand,
    /// Per-item status code.
    pub error_code: StatusCode,
    /// Server timestamp of the value.
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedReading {
    /// Returns `true` if the reading is GOOD.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.quality_band.is_good()
    }
}

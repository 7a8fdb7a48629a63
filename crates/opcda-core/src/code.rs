// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Remote status codes.
//!
//! OPC DA servers and the DCOM layer underneath report failures as 32-bit
//! `HRESULT`-style codes. [`StatusCode`] wraps the raw value, renders it as
//! `0xXXXXXXXX` and looks up a human readable description for the codes the
//! reader knows about. Unknown codes pass through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-bit status code reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(u32);

impl StatusCode {
    /// `S_OK`.
    pub const OK: Self = Self(0x0000_0000);
    /// Access denied, usually bad credentials.
    pub const ACCESS_DENIED: Self = Self(0x0000_0005);
    /// Clsid syntax is invalid.
    pub const INVALID_CLSID_SYNTAX: Self = Self(0x0000_0061);
    /// Clsid is not registered on the target host.
    pub const CLSID_NOT_FOUND: Self = Self(0x8004_0154);
    /// `OPC_E_INVALIDHANDLE`.
    pub const INVALID_HANDLE: Self = Self(0xC004_0001);
    /// `OPC_E_BADTYPE`.
    pub const BAD_TYPE: Self = Self(0xC004_0004);
    /// `OPC_E_PUBLIC`.
    pub const PUBLIC_GROUP: Self = Self(0xC004_0005);
    /// `OPC_E_BADRIGHTS`.
    pub const BAD_RIGHTS: Self = Self(0xC004_0006);
    /// `OPC_E_UNKNOWNITEMID`.
    pub const UNKNOWN_ITEM_ID: Self = Self(0xC004_0007);
    /// `OPC_E_INVALIDITEMID`.
    pub const INVALID_ITEM_ID: Self = Self(0xC004_0008);
    /// `OPC_E_INVALIDFILTER`.
    pub const INVALID_FILTER: Self = Self(0xC004_0009);
    /// `OPC_E_UNKNOWNPATH`.
    pub const UNKNOWN_PATH: Self = Self(0xC004_000A);
    /// `OPC_E_RANGE`.
    pub const OUT_OF_RANGE: Self = Self(0xC004_000B);
    /// `OPC_E_DUPLICATENAME`.
    pub const DUPLICATE_NAME: Self = Self(0xC004_000C);
    /// `OPC_S_UNSUPPORTEDRATE`.
    pub const UNSUPPORTED_RATE: Self = Self(0x0004_000D);
    /// `OPC_S_CLAMP`.
    pub const CLAMPED: Self = Self(0x0004_000E);
    /// `OPC_S_INUSE`.
    pub const IN_USE: Self = Self(0x0004_000F);
    /// `OPC_E_INVALIDCONFIGFILE`.
    pub const INVALID_CONFIG_FILE: Self = Self(0xC004_0010);
    /// `OPC_E_NOTFOUND`.
    pub const NOT_FOUND: Self = Self(0xC004_0011);
    /// `OPC_E_INVALID_PID`.
    pub const INVALID_PROPERTY_ID: Self = Self(0xC004_0203);

    /// Codes after which retrying cannot succeed without operator action.
    pub const FATAL: [Self; 4] = [
        Self::ACCESS_DENIED,
        Self::INVALID_CONFIG_FILE,
        Self::CLSID_NOT_FOUND,
        Self::INVALID_CLSID_SYNTAX,
    ];

    /// Wraps a raw code.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw code.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns `true` for the success code.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if reconnecting after this code is pointless.
    pub fn is_fatal(&self) -> bool {
        Self::FATAL.contains(self)
    }

    /// Returns the description of a known code.
    pub fn description(&self) -> Option<&'static str> {
        let text = match self.0 {
            0x8004_0154 => "Clsid is not found.",
            0x0000_0005 => "Access denied. Username and/or password might be wrong.",
            0xC004_0006 => "The Items AccessRights do not allow the operation.",
            0xC004_0004 => {
                "The server cannot convert the data between the specified format/ requested data type and the canonical data type."
            }
            0xC004_000C => "Duplicate name not allowed.",
            0xC004_0010 => "The server's configuration file is an invalid format.",
            0xC004_0009 => "The filter string was not valid",
            0xC004_0001 => {
                "The value of the handle is invalid. Note: a client should never pass an invalid handle to a server. If this error occurs, it is due to a programming error in the client or possibly in the server."
            }
            0xC004_0008 => "The item ID doesn't conform to the server's syntax.",
            0xC004_0203 => "The passed property ID is not valid for the item.",
            0xC004_0011 => "Requested Object (e.g. a public group) was not found.",
            0xC004_0005 => "The requested operation cannot be done on a public group.",
            0xC004_000B => "The value was out of range.",
            0xC004_0007 => {
                "The item ID is not defined in the server address space (on add or validate) or no longer exists in the server address space (for read or write)."
            }
            0xC004_000A => "The item's access path is not known to the server.",
            0x0004_000E => "A value passed to WRITE was accepted but the output was clamped.",
            0x0004_000F => {
                "The operation cannot be performed because the object is being referenced."
            }
            0x0004_000D => {
                "The server does not support the requested data rate but will use the closest available rate."
            }
            0x0000_0061 => "Clsid syntax is invalid",
            _ => return None,
        };
        Some(text)
    }

    /// Returns the description, or `fallback` for unknown codes.
    pub fn describe_or<'a>(&self, fallback: &'a str) -> &'a str {
        match self.description() {
            Some(text) => text,
            None => fallback,
        }
    }
}

impl From<u32> for StatusCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

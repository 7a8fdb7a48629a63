// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Quality classification for raw OPC DA quality codes.
//!
//! OPC DA reports quality as an 8-bit field. Only the coarse band matters
//! downstream:
//!
//! | Range        | Band        |
//! |--------------|-------------|
//! | `0..64`      | `Bad`       |
//! | `64..192`    | `Uncertain` |
//! | `192..=219`  | `Good`      |
//! | anything else| `Unknown`   |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic quality band of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityBand {
    /// The value is reliable.
    Good,
    /// The value may be usable.
    Uncertain,
    /// The value must not be used.
    Bad,
    /// The quality code is outside the known ranges.
    Unknown,
}

impl QualityBand {
    /// Returns `true` for [`QualityBand::Good`].
    #[inline]
    pub fn is_good(&self) -> bool {
        matches!(self, QualityBand::Good)
    }

    /// Returns the upper-case name used in output messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBand::Good => "GOOD",
            QualityBand::Uncertain => "UNCERTAIN",
            QualityBand::Bad => "BAD",
            QualityBand::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw quality code to its band.
///
/// Takes a wide signed integer so that negative and out-of-range input
/// from loosely typed transports classifies as `Unknown` instead of
/// wrapping.
pub fn classify(raw: i64) -> QualityBand {
    match raw {
        0..=63 => QualityBand::Bad,
        64..=191 => QualityBand::Uncertain,
        192..=219 => QualityBand::Good,
        _ => QualityBand::Unknown,
    }
}

/// Returns `true` only if every band is [`QualityBand::Good`].
///
/// An empty set is vacuously good; callers decide separately what an empty
/// cycle means.
pub fn all_good<'a>(bands: impl IntoIterator<Item = &'a QualityBand>) -> bool {
    bands.into_iter().all(QualityBand::is_good)
}

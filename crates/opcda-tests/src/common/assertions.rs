// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions

use opcda_client::{CycleOutcome, OutputMessage};
use opcda_core::{ClassifiedReading, DaValue, NodeStatus, QualityBand};

// =============================================================================
// Reading Assertions
// =============================================================================

/// Assertion extensions for a classified reading.
pub trait ReadingAssertions {
    /// Assert the item and value.
    fn assert_reading(&self, item: &str, value: &DaValue);

    /// Assert the quality band.
    fn assert_band(&self, band: QualityBand);
}

impl ReadingAssertions for ClassifiedReading {
    fn assert_reading(&self, item: &str, value: &DaValue) {
        assert_eq!(self.item_id.as_str(), item, "Unexpected item in {:?}", self);
        assert_eq!(
            &self.value, value,
            "Expected value {:?} for {}, but got {:?}",
            value, item, self.value
        );
    }

    fn assert_band(&self, band: QualityBand) {
        assert_eq!(
            self.quality_band, band,
            "Expected {} quality for {}, but got {}",
            band, self.item_id, self.quality_band
        );
    }
}

// =============================================================================
// Output Assertions
// =============================================================================

/// Returns the item identifiers of an output, in order.
pub fn item_ids(message: &OutputMessage) -> Vec<&str> {
    message.payload.iter().map(|r| r.item_id.as_str()).collect()
}

/// Asserts a completed cycle and returns its output.
pub fn assert_completed(outcome: &CycleOutcome, expected: NodeStatus) -> Option<&OutputMessage> {
    match outcome {
        CycleOutcome::Completed { status, output } => {
            assert_eq!(*status, expected, "Unexpected cycle status");
            output.as_ref()
        }
        CycleOutcome::Skipped(reason) => {
            panic!("Expected a completed cycle with {}, but it was skipped: {:?}", expected, reason)
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # OPC DA Reader Integration Tests
//!
//! Shared test utilities and the integration suites of the workspace.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built settings, reader configs and config files
//!   - `assertions`: Assertion helpers for readings and outputs
//!   - `mocks`: A scriptable remote data source
//!   - `harness`: A reader wired to the mock and a channel reporter
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p opcda-tests
//! cargo test -p opcda-tests --test integration_reader
//! cargo test -p opcda-tests --test integration_reconnect
//! cargo test -p opcda-tests --test integration_config
//! ```
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use opcda_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let mut harness = ReaderHarness::new(ReaderFixtures::two_tags());
//!     harness.mock.set_value("Tag1", 10, 192);
//!     harness.start_ready().await;
//!     let outcome = harness.reader.handle_payload("{}").await.unwrap();
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::init_test_logging;
    pub use crate::common::mocks::*;
}

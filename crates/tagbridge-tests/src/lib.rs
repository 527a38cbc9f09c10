// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge Integration Tests
//!
//! Shared mocks and fixtures plus the integration suites under `tests/`.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tagbridge-tests
//! cargo test -p tagbridge-tests --test integration_engine
//! cargo test -p tagbridge-tests --test integration_state
//! cargo test -p tagbridge-tests --test integration_config
//! cargo test -p tagbridge-tests --test integration_runtime
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagbridge_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let dir = temp_test_dir("engine");
//!     let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
//!     // ... build a SyncEngine with ConfigFixtures::engine_context(dir.path())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}

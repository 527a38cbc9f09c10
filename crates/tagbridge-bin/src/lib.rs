// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-bin
//!
//! Command line entry point for tagbridge.
//!
//! ```text
//!   main.rs ──► cli.rs ──► commands ──► runtime ──► tagbridge-core::SyncEngine
//!                               │           │
//!                            logging     shutdown
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the sync loop (default command)
//! tagbridge -c /etc/tagbridge/bridge.yaml
//!
//! # Continue from the persisted snapshot
//! tagbridge run --startup resume
//!
//! # Validate configuration
//! tagbridge validate --show-config
//!
//! # Show version
//! tagbridge version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{BridgeRuntime, RuntimeBuilder, RuntimeHandle};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-config
//!
//! Configuration management for the tagbridge sync engine.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tagbridge_config::loader::load_config;
//!
//! let config = load_config("tagbridge.yaml").unwrap();
//! println!("Node: {}/{}", config.node.group_id, config.node.node_id);
//! ```
//!
//! ## Configuration Schema
//!
//! - `node` - group, node and device identity
//! - `source` - tag snapshot location and pull timeout
//! - `sync` - poll interval, state file and startup mode
//! - `logging` - level and format
//!
//! Values can reference environment variables:
//!
//! ```yaml
//! node:
//!   node_id: "${NODE_ID:N1}"
//! ```
//!
//! and `TAGBRIDGE_*` variables override selected fields after parsing:
//!
//! ```text
//! TAGBRIDGE_NODE_ID=N2
//! TAGBRIDGE_STATE_PATH=/var/lib/tagbridge/knownMetrics.json
//! TAGBRIDGE_LOG_LEVEL=debug
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    BridgeConfig, LogFormat, LogLevel, LoggingConfig, NodeConfig, SourceConfig, SyncConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "tagbridge-config");
        assert!(!VERSION.is_empty());
    }
}

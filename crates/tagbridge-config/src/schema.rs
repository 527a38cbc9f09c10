// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for tagbridge.
//!
//! # Schema Structure
//!
//! ```text
//! BridgeConfig
//! ├── node: NodeConfig        (group, node and device identity)
//! ├── source: SourceConfig    (tag snapshot location, pull timeout)
//! ├── sync: SyncConfig        (poll interval, state file, startup mode)
//! └── logging: LoggingConfig
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tagbridge_core::{EngineContext, StartupMode};

// =============================================================================
// Constants
// =============================================================================

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default pull timeout in milliseconds.
pub const DEFAULT_PULL_TIMEOUT_MS: u64 = 30_000;

/// Minimum poll interval in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Maximum poll interval in milliseconds (1 hour).
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Default state file name.
pub const DEFAULT_STATE_PATH: &str = "knownMetrics.json";

/// Default consecutive failures before health is degraded.
pub const DEFAULT_DEGRADED_AFTER: u32 = 3;

/// Maximum length of an identity field.
const MAX_ID_LEN: usize = 64;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for tagbridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Namespace identity.
    pub node: NodeConfig,

    /// Tag source settings.
    pub source: SourceConfig,

    /// Reconciliation settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.node.validate()?;
        self.source.validate()?;
        self.sync.validate()?;
        Ok(())
    }

    /// Builds the engine context for this deployment.
    pub fn engine_context(&self) -> EngineContext {
        EngineContext::new(self.node.node_id.clone(), self.sync.state_path.clone())
            .with_pull_timeout(self.source.pull_timeout())
            .with_degraded_after(self.sync.degraded_after)
    }
}

// =============================================================================
// Node Configuration
// =============================================================================

/// Identity of the publishing node in the metric namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Group the node belongs to.
    pub group_id: String,

    /// Node id, embedded in every metric name as `_<node_id>`.
    pub node_id: String,

    /// Device id under the node.
    pub device_id: String,
}

impl NodeConfig {
    /// Validates the node configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("node.group_id", &self.group_id),
            ("node.node_id", &self.node_id),
            ("node.device_id", &self.device_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::validation(field, "cannot be empty"));
            }
            if value.len() > MAX_ID_LEN {
                return Err(ConfigError::validation(
                    field,
                    format!("cannot exceed {} characters", MAX_ID_LEN),
                ));
            }
        }

        if self.node_id.contains(['/', '\\', '.']) {
            return Err(ConfigError::validation(
                "node.node_id",
                "cannot contain '/', '\\' or '.'",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Source Configuration
// =============================================================================

/// Tag source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// JSON file holding the tag snapshot.
    pub snapshot_path: PathBuf,

    /// Upper bound for one pull in milliseconds.
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,
}

fn default_pull_timeout_ms() -> u64 {
    DEFAULT_PULL_TIMEOUT_MS
}

impl SourceConfig {
    /// Returns the pull timeout.
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }

    /// Validates the source configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(ConfigError::validation("source.snapshot_path", "cannot be empty"));
        }
        if self.pull_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "source.pull_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Interval between cycles in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// State snapshot file.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// How the initial state is built.
    #[serde(default)]
    pub startup: StartupMode,

    /// Consecutive failed pulls before health is reported degraded.
    #[serde(default = "default_degraded_after")]
    pub degraded_after: u32,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_degraded_after() -> u32 {
    DEFAULT_DEGRADED_AFTER
}

impl SyncConfig {
    /// Returns the poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validates the sync configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::validation(
                "sync.poll_interval_ms",
                format!("must be at least {}ms", MIN_POLL_INTERVAL_MS),
            ));
        }
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::validation(
                "sync.poll_interval_ms",
                format!("cannot exceed {}ms", MAX_POLL_INTERVAL_MS),
            ));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::validation("sync.state_path", "cannot be empty"));
        }
        if self.degraded_after == 0 {
            return Err(ConfigError::validation(
                "sync.degraded_after",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            state_path: default_state_path(),
            startup: StartupMode::default(),
            degraded_after: DEFAULT_DEGRADED_AFTER,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty format for development.
    #[default]
    Pretty,
    /// Compact format.
    Compact,
    /// JSON format for production.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loading bridge configuration from disk in every supported format.
//!
//! - `test_load_*`: files, relative paths and environment overrides
//! - `test_validation_*`: rejected settings

use std::time::Duration;

use tagbridge_config::{
    load_config, load_config_str, BridgeConfig, ConfigError, ConfigFormat, ConfigLoader, LogFormat,
    LogLevel,
};
use tagbridge_core::StartupMode;
use tagbridge_tests::prelude::*;

fn write_config(dir: &tempfile::TempDir, file: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_load_yaml_resolves_relative_paths() {
    let dir = temp_test_dir("config-yaml");
    let path = write_config(&dir, "tagbridge.yaml", ConfigFixtures::yaml());

    let config = load_config(&path).unwrap();

    assert_eq!(config.node.node_id, "N1");
    assert_eq!(config.source.snapshot_path, dir.path().join("tags.json"));
    assert_eq!(
        config.sync.state_path,
        dir.path().join("state").join("knownMetrics.json")
    );
    assert_eq!(config.sync.poll_interval(), Duration::from_millis(20));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[tokio::test]
async fn test_load_toml_and_json_agree() {
    let dir = temp_test_dir("config-formats");
    let toml = write_config(
        &dir,
        "bridge.toml",
        r#"
[node]
group_id = "Plant"
node_id = "N1"
device_id = "Packaging"

[source]
snapshot_path = "tags.json"
pull_timeout_ms = 2000

[sync]
poll_interval_ms = 20
state_path = "knownMetrics.json"
startup = "resume"
"#,
    );
    let json = write_config(
        &dir,
        "bridge.json",
        r#"{
  "node": { "group_id": "Plant", "node_id": "N1", "device_id": "Packaging" },
  "source": { "snapshot_path": "tags.json", "pull_timeout_ms": 2000 },
  "sync": { "poll_interval_ms": 20, "state_path": "knownMetrics.json", "startup": "resume" }
}"#,
    );

    let from_toml = load_config(&toml).unwrap();
    let from_json = load_config(&json).unwrap();

    for config in [&from_toml, &from_json] {
        assert_eq!(config.sync.startup, StartupMode::Resume);
        assert_eq!(config.sync.state_path, dir.path().join("knownMetrics.json"));
        assert_eq!(config.source.pull_timeout(), Duration::from_secs(2));
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}

#[tokio::test]
async fn test_load_builds_engine_context() {
    let dir = temp_test_dir("config-context");
    let path = write_config(&dir, "tagbridge.yaml", ConfigFixtures::yaml());

    let context = load_config(&path).unwrap().engine_context();

    assert_eq!(context.node_id, "N1");
    assert_eq!(context.pull_timeout, Duration::from_millis(2000));
    assert_eq!(context.degraded_after, 3);
    assert!(context.state_path.ends_with("state/knownMetrics.json"));
}

#[tokio::test]
async fn test_load_environment_overrides() {
    let dir = temp_test_dir("config-env");
    let path = write_config(&dir, "tagbridge.yaml", ConfigFixtures::yaml());

    std::env::set_var("TBINTEGENV_NODE_ID", "N7");
    std::env::set_var("TBINTEGENV_STARTUP", "resume");
    std::env::set_var("TBINTEGENV_POLL_INTERVAL_MS", "250");

    let config = ConfigLoader::new()
        .with_env_prefix("TBINTEGENV")
        .load(&path)
        .unwrap();

    assert_eq!(config.node.node_id, "N7");
    assert_eq!(config.sync.startup, StartupMode::Resume);
    assert_eq!(config.sync.poll_interval_ms, 250);
    assert_eq!(config.node.group_id, "Plant");
}

#[tokio::test]
async fn test_load_placeholders() {
    std::env::set_var("TBINTEG_SITE_NODE", "Edge4");
    let content = ConfigFixtures::yaml()
        .replace("node_id: N1", "node_id: ${TBINTEG_SITE_NODE}")
        .replace("device_id: Packaging", "device_id: ${TBINTEG_UNSET_DEVICE:Filler}");

    let config = load_config_str(&content, ConfigFormat::Yaml).unwrap();

    assert_eq!(config.node.node_id, "Edge4");
    assert_eq!(config.node.device_id, "Filler");
}

#[tokio::test]
async fn test_load_missing_file() {
    let dir = temp_test_dir("config-missing");
    let result = load_config(dir.path().join("absent.yaml"));

    assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
}

#[tokio::test]
async fn test_load_rejects_unknown_extension() {
    let dir = temp_test_dir("config-extension");
    let path = write_config(&dir, "tagbridge.ini", "node_id = N1");

    let result = load_config(&path);

    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}

// =============================================================================
// Validation
// =============================================================================

fn yaml_with(from: &str, to: &str) -> Result<BridgeConfig, ConfigError> {
    load_config_str(&ConfigFixtures::yaml().replace(from, to), ConfigFormat::Yaml)
}

#[tokio::test]
async fn test_validation_node_id() {
    for bad in ["node_id: N.1", "node_id: N/1", "node_id: \"\""] {
        let result = yaml_with("node_id: N1", bad);
        assert!(
            matches!(result, Err(ConfigError::Validation { .. })),
            "{bad} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_validation_poll_interval_bounds() {
    assert!(yaml_with("poll_interval_ms: 20", "poll_interval_ms: 5").is_err());
    assert!(yaml_with("poll_interval_ms: 20", "poll_interval_ms: 3600001").is_err());
    assert!(yaml_with("poll_interval_ms: 20", "poll_interval_ms: 10").is_ok());
}

#[tokio::test]
async fn test_validation_pull_timeout() {
    let result = yaml_with("pull_timeout_ms: 2000", "pull_timeout_ms: 0");
    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[tokio::test]
async fn test_validation_unknown_startup_mode() {
    assert!(yaml_with("startup: baseline", "startup: warm").is_err());
}

#[tokio::test]
async fn test_fixture_config_is_valid() {
    let dir = temp_test_dir("config-fixture");
    let config = ConfigFixtures::bridge_config(dir.path());

    assert!(config.validate().is_ok());
    assert_eq!(config.engine_context().pull_timeout, Duration::from_secs(2));
}

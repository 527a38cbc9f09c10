// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Realistic tag tables and configurations shared by the integration tests.

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;

use tagbridge_config::{BridgeConfig, LoggingConfig, NodeConfig, SourceConfig, SyncConfig};
use tagbridge_core::{EngineContext, SourceDataType, StartupMode, TagRecord};

/// Node id used throughout the fixtures.
pub const NODE_ID: &str = "N1";

// =============================================================================
// Tag Fixtures
// =============================================================================

/// Pre-built tag tables.
pub struct TagFixtures;

impl TagFixtures {
    /// A fixed observation time.
    pub fn observed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A packaging line with one tag of every source type.
    pub fn packaging_line() -> Vec<TagRecord> {
        let at = Self::observed_at();
        vec![
            TagRecord::new(1, "Line1.Speed", "12.5", SourceDataType::Double).with_updated_at(at),
            TagRecord::new(2, "Line1.Running", "1", SourceDataType::Boolean).with_updated_at(at),
            TagRecord::new(3, "Line1.Product", "SKU-100", SourceDataType::String)
                .with_updated_at(at),
            TagRecord::new(4, "Line1.Count", "420", SourceDataType::Integer)
                .with_quality(192)
                .with_updated_at(at),
        ]
    }

    /// A tag laid out along the enterprise hierarchy.
    pub fn hierarchical() -> TagRecord {
        TagRecord::new(
            10,
            "Acme.Dallas.Packaging.Reserved.Line2.Filler.Motor.Speed",
            "1450",
            SourceDataType::Integer,
        )
        .with_updated_at(Self::observed_at())
    }

    /// A record whose value does not parse as its declared type.
    pub fn unparsable() -> TagRecord {
        TagRecord::new(99, "Line1.Broken", "not-a-number", SourceDataType::Integer)
            .with_updated_at(Self::observed_at())
    }

    /// `count` generated double tags on one line.
    pub fn batch(count: usize) -> Vec<TagRecord> {
        (0..count)
            .map(|i| {
                TagRecord::new(
                    i as i64 + 1,
                    format!("Line9.Sensor{:03}", i),
                    format!("{}.0", i),
                    SourceDataType::Double,
                )
                .with_updated_at(Self::observed_at())
            })
            .collect()
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Pre-built configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A valid configuration rooted in `dir`.
    pub fn bridge_config(dir: &Path) -> BridgeConfig {
        BridgeConfig {
            node: NodeConfig {
                group_id: "Plant".into(),
                node_id: NODE_ID.into(),
                device_id: "Packaging".into(),
            },
            source: SourceConfig {
                snapshot_path: dir.join("tags.json"),
                pull_timeout_ms: 2_000,
            },
            sync: SyncConfig {
                poll_interval_ms: 20,
                state_path: dir.join("knownMetrics.json"),
                startup: StartupMode::Baseline,
                degraded_after: 3,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// An engine context writing its state into `dir`.
    pub fn engine_context(dir: &Path) -> EngineContext {
        EngineContext::new(NODE_ID, dir.join("knownMetrics.json"))
    }

    /// The YAML form of [`ConfigFixtures::bridge_config`] with relative paths.
    pub fn yaml() -> &'static str {
        r#"
node:
  group_id: Plant
  node_id: N1
  device_id: Packaging

source:
  snapshot_path: tags.json
  pull_timeout_ms: 2000

sync:
  poll_interval_ms: 20
  state_path: state/knownMetrics.json
  startup: baseline

logging:
  level: debug
  format: compact
"#
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-lifecycle metrics.
//!
//! These belong to the session protocol, not to the tag source. They are
//! always present in a state snapshot, are never overwritten by source data
//! and never take part in change detection.

use crate::types::{Metric, MetricValue};

/// Node rebirth request flag.
pub const NODE_REBIRTH: &str = "Node Control/Rebirth";

/// Device rebirth request flag.
pub const DEVICE_REBIRTH: &str = "Device Control/Rebirth";

/// Birth/death session sequence number.
pub const BD_SEQ: &str = "bdSeq";

/// Next-server pointer.
pub const NEXT_SERVER: &str = "Node Control/Next Server";

/// Transmission version marker.
pub const TRANSMISSION_VERSION: &str = "Node Info/Transmission Version";

/// Inbound scan-rate command. Not stored, only recognised as a trigger.
pub const SCAN_RATE: &str = "Node Control/Scan rate";

/// Names of all lifecycle metrics.
pub const LIFECYCLE_METRIC_NAMES: [&str; 5] =
    [NODE_REBIRTH, DEVICE_REBIRTH, BD_SEQ, NEXT_SERVER, TRANSMISSION_VERSION];

/// Returns `true` if `name` is a protocol-lifecycle metric.
pub fn is_lifecycle_metric(name: &str) -> bool {
    LIFECYCLE_METRIC_NAMES.contains(&name)
}

/// Returns the lifecycle metrics with their default values.
pub fn lifecycle_metrics() -> Vec<Metric> {
    vec![
        Metric::new(NODE_REBIRTH, MetricValue::Boolean(true)),
        Metric::new(DEVICE_REBIRTH, MetricValue::Boolean(true)),
        Metric::new(BD_SEQ, MetricValue::UInt64(0)),
        Metric::new(NEXT_SERVER, MetricValue::UInt64(0)),
        Metric::new(TRANSMISSION_VERSION, MetricValue::UInt64(0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricDataType;

    #[test]
    fn test_lifecycle_set() {
        let metrics = lifecycle_metrics();
        assert_eq!(metrics.len(), LIFECYCLE_METRIC_NAMES.len());
        for name in LIFECYCLE_METRIC_NAMES {
            assert!(metrics.iter().any(|m| m.name == name));
            assert!(is_lifecycle_metric(name));
        }
        assert!(!is_lifecycle_metric("_N1/Foo"));
        assert!(!is_lifecycle_metric(SCAN_RATE));
    }

    #[test]
    fn test_lifecycle_types() {
        let metrics = lifecycle_metrics();
        let bd_seq = metrics.iter().find(|m| m.name == BD_SEQ).unwrap();
        assert_eq!(bd_seq.data_type, MetricDataType::UInt64);
        let rebirth = metrics.iter().find(|m| m.name == NODE_REBIRTH).unwrap();
        assert_eq!(rebirth.value, MetricValue::Boolean(true));
    }
}

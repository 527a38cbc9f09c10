// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Inbound command triggers.

use std::time::Duration;

use crate::lifecycle::{DEVICE_REBIRTH, NODE_REBIRTH, SCAN_RATE};
use crate::types::{Metric, MetricValue};

/// A command delivered by the publish/subscribe side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Republish the node birth.
    NodeRebirth,
    /// Republish the device birth.
    DeviceRebirth,
    /// Change the poll interval.
    SetScanRate(Duration),
}

impl Trigger {
    /// Recognises a command metric.
    ///
    /// Rebirth commands only fire on a `true` value. The scan rate is read as
    /// whole milliseconds and must be positive. Anything else is `None`.
    pub fn from_command(metric: &Metric) -> Option<Self> {
        match metric.name.as_str() {
            NODE_REBIRTH if metric.value == MetricValue::Boolean(true) => Some(Trigger::NodeRebirth),
            DEVICE_REBIRTH if metric.value == MetricValue::Boolean(true) => {
                Some(Trigger::DeviceRebirth)
            }
            SCAN_RATE => metric
                .value
                .as_i64()
                .filter(|ms| *ms > 0)
                .map(|ms| Trigger::SetScanRate(Duration::from_millis(ms as u64))),
            _ => None,
        }
    }
}

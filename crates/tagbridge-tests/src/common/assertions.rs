// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions

use std::future::Future;
use std::time::Duration;

use tagbridge_core::{Metric, MetricValue, StateSnapshot};

/// Asserts that `metrics` holds `name` with `value`.
pub fn assert_metric(metrics: &[Metric], name: &str, value: impl Into<MetricValue>) {
    let value = value.into();
    let metric = metrics
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| {
            panic!(
                "Expected metric '{}', found [{}]",
                name,
                metrics.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
            )
        });
    assert_eq!(metric.value, value, "Unexpected value for '{}'", name);
}

/// Asserts that the snapshot holds `name` with `value`.
pub fn assert_known(snapshot: &StateSnapshot, name: &str, value: impl Into<MetricValue>) {
    let metric = snapshot
        .get(name)
        .unwrap_or_else(|| panic!("Expected '{}' in the state snapshot", name));
    assert_eq!(metric.value, value.into(), "Unexpected stored value for '{}'", name);
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

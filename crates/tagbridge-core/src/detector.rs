// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Change detection against the known-metric snapshot.
//!
//! Two channels, never merged:
//!
//! - [`ChangeDetector::detect_changes`] returns value changes of metrics the
//!   snapshot already knows and writes the new values into the snapshot.
//! - [`ChangeDetector::detect_new_metrics`] returns metrics the snapshot does
//!   not know yet and leaves the snapshot alone. Accepting them is a separate
//!   step taken once their birth has been published.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::lifecycle::is_lifecycle_metric;
use crate::state::StateSnapshot;
use crate::types::Metric;

/// Detects value changes and newly discovered metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Creates a detector.
    pub fn new() -> Self {
        Self
    }

    /// Returns the delta of `fresh` against `store` and applies it.
    ///
    /// A metric counts as changed when its typed value differs from the
    /// stored one. The stored entry is replaced before returning. A name that
    /// occurs more than once in `fresh` yields a single delta entry carrying
    /// the last value. Unknown names and lifecycle metrics are skipped.
    pub fn detect_changes(&self, fresh: &[Metric], store: &mut StateSnapshot) -> Vec<Metric> {
        let mut delta: Vec<Metric> = Vec::new();
        let mut queued: HashMap<String, usize> = HashMap::new();

        for metric in fresh {
            if is_lifecycle_metric(&metric.name) {
                continue;
            }

            let changed = match store.get(&metric.name) {
                Some(known) => known.value != metric.value,
                None => continue,
            };
            if !changed {
                continue;
            }

            match queued.get(&metric.name) {
                Some(&slot) => delta[slot] = metric.clone(),
                None => {
                    queued.insert(metric.name.clone(), delta.len());
                    delta.push(metric.clone());
                }
            }
            store.upsert(metric.clone());
        }

        if !delta.is_empty() {
            debug!(changed = delta.len(), "Detected value changes");
        }
        delta
    }

    /// Returns metrics in `fresh` that `store` does not know and that are not
    /// already queued.
    pub fn detect_new_metrics(
        &self,
        fresh: &[Metric],
        already_queued: &[Metric],
        store: &StateSnapshot,
    ) -> BTreeMap<String, Metric> {
        let mut discovered = BTreeMap::new();

        for metric in fresh {
            if is_lifecycle_metric(&metric.name)
                || store.contains(&metric.name)
                || already_queued.iter().any(|q| q.name == metric.name)
            {
                continue;
            }
            if !discovered.contains_key(&metric.name) {
                info!(name = %metric.name, data_type = %metric.data_type, "New metric discovered");
            }
            discovered.insert(metric.name.clone(), metric.clone());
        }

        if !discovered.is_empty() {
            warn!(
                discovered = discovered.len(),
                "Metric configuration outdated, new metrics need a birth"
            );
        }
        discovered
    }
}

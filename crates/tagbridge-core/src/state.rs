// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Durable registry of known metrics.
//!
//! [`StateSnapshot`] is the data: a timestamp plus every known metric keyed by
//! its namespaced name. [`StateStore`] is the shared handle the engine mutates
//! under an exclusive lock and status readers clone from.
//! [`StatePersistence`] reads and writes the snapshot file.
//!
//! # File layout
//!
//! ```json
//! {
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "knownMetrics": {
//!     "Line1/_N1/Speed": { "name": "Line1/_N1/Speed", "dataType": "Int32", ... }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::lifecycle::{is_lifecycle_metric, lifecycle_metrics};
use crate::types::Metric;

// =============================================================================
// StateSnapshot
// =============================================================================

/// Timestamp plus the full known-metric map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Time of the last save.
    pub timestamp: DateTime<Utc>,
    /// Known metrics by namespaced name.
    #[serde(default)]
    known_metrics: BTreeMap<String, Metric>,
}

impl StateSnapshot {
    /// Creates an empty snapshot without lifecycle metrics.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            known_metrics: BTreeMap::new(),
        }
    }

    /// Creates a snapshot holding only the lifecycle metrics.
    pub fn with_defaults() -> Self {
        let mut snapshot = Self::empty();
        snapshot.ensure_defaults();
        snapshot
    }

    /// Builds a snapshot from metrics. The first occurrence of a name wins.
    pub fn from_metrics(metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut snapshot = Self::empty();
        for metric in metrics {
            if snapshot.known_metrics.contains_key(&metric.name) {
                debug!(name = %metric.name, "Duplicate metric name ignored");
                continue;
            }
            snapshot.known_metrics.insert(metric.name.clone(), metric);
        }
        snapshot
    }

    /// Inserts every missing lifecycle metric. Existing entries are kept.
    ///
    /// Returns the number of metrics added.
    pub fn ensure_defaults(&mut self) -> usize {
        let mut added = 0;
        for metric in lifecycle_metrics() {
            if !self.known_metrics.contains_key(&metric.name) {
                self.known_metrics.insert(metric.name.clone(), metric);
                added += 1;
            }
        }
        added
    }

    /// Returns the metric stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.known_metrics.get(name)
    }

    /// Returns `true` if `name` is known.
    pub fn contains(&self, name: &str) -> bool {
        self.known_metrics.contains_key(name)
    }

    /// Number of known metrics, lifecycle metrics included.
    pub fn len(&self) -> usize {
        self.known_metrics.len()
    }

    /// Returns `true` if nothing is known.
    pub fn is_empty(&self) -> bool {
        self.known_metrics.is_empty()
    }

    /// Iterates known metrics in name order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.known_metrics.values()
    }

    /// Replaces the stored metric with the same name.
    pub(crate) fn upsert(&mut self, metric: Metric) {
        self.known_metrics.insert(metric.name.clone(), metric);
    }

    /// Adds a metric whose name is not yet known. Lifecycle names are refused.
    pub(crate) fn insert_new(&mut self, metric: Metric) -> bool {
        if is_lifecycle_metric(&metric.name) || self.known_metrics.contains_key(&metric.name) {
            return false;
        }
        self.known_metrics.insert(metric.name.clone(), metric);
        true
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// StateStore
// =============================================================================

/// Shared, lock-guarded snapshot.
///
/// Writers hold the exclusive lock for the whole read-modify-write of a
/// detection pass. Readers never see a half-applied batch; they get a copy.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<StateSnapshot>>,
}

impl StateStore {
    /// Wraps an existing snapshot.
    pub fn new(snapshot: StateSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Returns a consistent copy of the current snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.read().clone()
    }

    /// Returns `true` if `name` is known.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    /// Number of known metrics.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if nothing is known.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Replaces the whole snapshot.
    pub(crate) fn replace(&self, snapshot: StateSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Takes a shared lock.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StateSnapshot> {
        self.inner.read()
    }

    /// Takes the exclusive lock.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StateSnapshot> {
        self.inner.write()
    }
}

// =============================================================================
// StatePersistence
// =============================================================================

/// Reads and writes the snapshot file of one deployment.
#[derive(Debug, Clone)]
pub struct StatePersistence {
    path: PathBuf,
}

impl StatePersistence {
    /// Creates a persistence handle for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot.
    ///
    /// A missing or unreadable file yields a snapshot holding only the
    /// lifecycle metrics. This never fails.
    pub fn load(&self) -> StateSnapshot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No persisted state, starting empty");
                return StateSnapshot::with_defaults();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read persisted state");
                return StateSnapshot::with_defaults();
            }
        };

        match serde_json::from_str::<StateSnapshot>(&content) {
            Ok(mut snapshot) => {
                let added = snapshot.ensure_defaults();
                info!(
                    path = %self.path.display(),
                    metrics = snapshot.len(),
                    defaults_added = added,
                    saved_at = %snapshot.timestamp,
                    "Loaded persisted state"
                );
                snapshot
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Persisted state is corrupt, starting empty");
                StateSnapshot::with_defaults()
            }
        }
    }

    /// Writes the whole snapshot, replacing the previous file.
    ///
    /// The timestamp is refreshed first. The document goes to a sibling
    /// temporary file which is synced and then renamed over the target.
    pub fn save(&self, snapshot: &mut StateSnapshot) -> StateResult<()> {
        snapshot.timestamp = Utc::now();
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(|e| StateError::io(&tmp, e))?;
            file.write_all(&json).map_err(|e| StateError::io(&tmp, e))?;
            file.sync_all().map_err(|e| StateError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| StateError::io(&self.path, e))?;

        debug!(path = %self.path.display(), metrics = snapshot.len(), "State saved");
        Ok(())
    }

    /// Builds a fresh snapshot from a full pull, adds the lifecycle metrics and
    /// saves it immediately.
    pub fn generate_baseline(
        &self,
        metrics: impl IntoIterator<Item = Metric>,
    ) -> StateResult<StateSnapshot> {
        let mut snapshot = StateSnapshot::from_metrics(
            metrics.into_iter().filter(|m| !is_lifecycle_metric(&m.name)),
        );
        snapshot.ensure_defaults();
        self.save(&mut snapshot)?;

        info!(
            path = %self.path.display(),
            metrics = snapshot.len(),
            "Generated baseline state"
        );
        Ok(snapshot)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reconciliation cycle orchestration.
//!
//! # Cycle
//!
//! ```text
//! ┌──────┐   snapshot   ┌───────────┐  delta + new  ┌──────┐
//! │ PULL │ ───────────▶ │ RECONCILE │ ────────────▶ │ EMIT │ ──▶ CycleBatch
//! └──────┘              └───────────┘               └──────┘
//!    │ timeout / error
//!    ▼
//! cycle fails, nothing mutated
//! ```
//!
//! - **PULL** fetches the full source snapshot under a timeout.
//! - **RECONCILE** classifies every record against the identity index,
//!   converts the candidates into metric form and runs both detector channels
//!   against the state store under its exclusive lock.
//! - **EMIT** swaps in the new identity index and assembles the batch.
//!
//! A cycle either returns a complete batch or fails without side effects.
//! Overlapping cycles are refused with [`BridgeError::CycleInProgress`].
//!
//! # Writeback
//!
//! [`SyncEngine::apply_outgoing`] converts metrics back into tag writes.
//! Failures are isolated per record.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::adapter::TypeAdapter;
use crate::detector::ChangeDetector;
use crate::error::{BridgeError, BridgeResult, PublishError, SourceError, TransformError};
use crate::lifecycle::{is_lifecycle_metric, SCAN_RATE};
use crate::naming::NameTransformer;
use crate::reconciler::{Continuity, IdentityIndex, IdentityReconciler};
use crate::source::{TagSource, TagWriter};
use crate::state::{StatePersistence, StateSnapshot, StateStore};
use crate::types::{Metric, TagRecord};

/// Default timeout for a single snapshot pull.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of consecutive failed pulls before the engine reports degraded health.
pub const DEFAULT_DEGRADED_AFTER: u32 = 3;

// =============================================================================
// Context
// =============================================================================

/// How the engine builds its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupMode {
    /// Derive a new baseline from the first pull and save it.
    #[default]
    Baseline,
    /// Load the persisted snapshot and report what changed while stopped.
    Resume,
}

impl StartupMode {
    /// Returns the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupMode::Baseline => "baseline",
            StartupMode::Resume => "resume",
        }
    }
}

/// Everything one engine instance needs to know about its deployment.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Node id embedded in every metric name.
    pub node_id: String,
    /// Snapshot file.
    pub state_path: PathBuf,
    /// Upper bound for one pull.
    pub pull_timeout: Duration,
    /// Consecutive failed pulls before health turns degraded.
    pub degraded_after: u32,
}

impl EngineContext {
    /// Creates a context with default timeouts.
    pub fn new(node_id: impl Into<String>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            node_id: node_id.into(),
            state_path: state_path.into(),
            pull_timeout: DEFAULT_PULL_TIMEOUT,
            degraded_after: DEFAULT_DEGRADED_AFTER,
        }
    }

    /// Sets the pull timeout.
    pub fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    /// Sets the degraded-health threshold.
    pub fn with_degraded_after(mut self, failures: u32) -> Self {
        self.degraded_after = failures.max(1);
        self
    }
}

// =============================================================================
// Results
// =============================================================================

/// Output of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleBatch {
    /// Cycle sequence number.
    pub cycle: u64,
    /// Value changes of known metrics. Already applied to the store.
    pub changed: Vec<Metric>,
    /// Metrics the store does not know yet. Not applied.
    pub discovered: BTreeMap<String, Metric>,
    /// Records dropped because they failed to transform.
    pub dropped: usize,
}

impl CycleBatch {
    /// Returns `true` if there is nothing to publish.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.discovered.is_empty()
    }

    /// Returns the discovered metrics in name order.
    pub fn discovered_metrics(&self) -> Vec<Metric> {
        self.discovered.values().cloned().collect()
    }
}

/// Output of [`SyncEngine::bootstrap`].
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    /// The full known set to announce.
    pub birth: Vec<Metric>,
    /// Changes and discoveries found against a resumed snapshot.
    pub pending: CycleBatch,
}

/// Summary of a writeback call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WritebackReport {
    /// Records the writer accepted.
    pub written: usize,
    /// Records the writer rejected.
    pub failed: usize,
    /// Records that never reached the writer.
    pub skipped: usize,
}

/// Health as seen by a status collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    /// Pull failures since the last successful cycle.
    pub consecutive_failures: u32,
    /// Cycles attempted.
    pub cycles_total: u64,
    /// Cycles failed.
    pub cycles_failed: u64,
    /// Time of the last successful cycle.
    pub last_success: Option<DateTime<Utc>>,
    /// Batches the publisher rejected. Their values are already in the store.
    pub publish_failures: u64,
    /// Last pull or publish error.
    pub last_error: Option<String>,
    /// `true` once failures reached the configured threshold.
    pub degraded: bool,
}

#[derive(Debug, Default)]
struct HealthTracker {
    consecutive_failures: AtomicU32,
    cycles_total: AtomicU64,
    cycles_failed: AtomicU64,
    publish_failures: AtomicU64,
    last_success: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl HealthTracker {
    fn record_success(&self) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.last_success.write() = Some(Utc::now());
    }

    fn record_failure(&self, error: &SourceError) -> u32 {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = Some(error.to_string());
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_publish_failure(&self, error: &PublishError) -> u64 {
        *self.last_error.write() = Some(error.to_string());
        self.publish_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn snapshot(&self, degraded_after: u32) -> EngineHealth {
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        EngineHealth {
            consecutive_failures,
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            last_success: *self.last_success.read(),
            last_error: self.last_error.read().clone(),
            degraded: consecutive_failures >= degraded_after,
        }
    }
}

// =============================================================================
// SyncEngine
// =============================================================================

/// Reconciles one tag source with one node's metric namespace.
pub struct SyncEngine {
    context: EngineContext,
    names: NameTransformer,
    adapter: TypeAdapter,
    detector: ChangeDetector,
    reconciler: IdentityReconciler,
    persistence: StatePersistence,
    source: Arc<dyn TagSource>,
    writer: Arc<dyn TagWriter>,
    state: StateStore,
    index: RwLock<IdentityIndex>,
    cycle_gate: tokio::sync::Mutex<()>,
    writeback_gate: tokio::sync::RwLock<()>,
    cancelled: AtomicBool,
    cycles: AtomicU64,
    health: HealthTracker,
}

impl SyncEngine {
    /// Creates an engine with a snapshot holding only the lifecycle metrics.
    pub fn new(
        context: EngineContext,
        source: Arc<dyn TagSource>,
        writer: Arc<dyn TagWriter>,
    ) -> BridgeResult<Self> {
        let names = NameTransformer::new(context.node_id.clone())?;
        let persistence = StatePersistence::new(context.state_path.clone());

        Ok(Self {
            context,
            names,
            adapter: TypeAdapter::new(),
            detector: ChangeDetector::new(),
            reconciler: IdentityReconciler::new(),
            persistence,
            source,
            writer,
            state: StateStore::new(StateSnapshot::with_defaults()),
            index: RwLock::new(IdentityIndex::new()),
            cycle_gate: tokio::sync::Mutex::new(()),
            writeback_gate: tokio::sync::RwLock::new(()),
            cancelled: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
            health: HealthTracker::default(),
        })
    }

    /// Returns the engine context.
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Returns the name transformer for this node.
    pub fn names(&self) -> &NameTransformer {
        &self.names
    }

    /// Returns a shared handle to the state store.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Returns a consistent copy of the current state.
    pub fn state_snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Number of records in the identity index.
    pub fn indexed_records(&self) -> usize {
        self.index.read().len()
    }

    /// Returns the current health.
    pub fn health(&self) -> EngineHealth {
        self.health.snapshot(self.context.degraded_after)
    }

    /// Records a batch the publisher rejected.
    ///
    /// Pull health is unaffected; the count shows up in [`EngineHealth`].
    pub fn record_publish_failure(&self, error: &PublishError) -> u64 {
        self.health.record_publish_failure(error)
    }

    /// Requests cancellation. Takes effect at the start of the next cycle.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!(node = %self.context.node_id, "Engine cancellation requested");
        }
    }

    /// Returns `true` once [`SyncEngine::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns every known metric in name order.
    pub fn birth_metrics(&self) -> Vec<Metric> {
        self.state.snapshot().metrics().cloned().collect()
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Builds the initial state and identity index.
    pub async fn bootstrap(&self, mode: StartupMode) -> BridgeResult<Bootstrap> {
        self.ensure_running()?;
        let _cycle = self.cycle_gate.lock().await;

        let records = self.pull().await?;
        let (metrics, dropped) = self.convert(records.iter());

        let pending = match mode {
            StartupMode::Baseline => {
                let snapshot = self.persistence.generate_baseline(metrics)?;
                self.state.replace(snapshot);
                CycleBatch {
                    dropped,
                    ..CycleBatch::default()
                }
            }
            StartupMode::Resume => {
                let mut snapshot = self.persistence.load();
                let changed = self.detector.detect_changes(&metrics, &mut snapshot);
                // Nothing is awaiting a birth before the first one.
                let discovered = self.detector.detect_new_metrics(&metrics, &[], &snapshot);
                self.state.replace(snapshot);
                CycleBatch {
                    cycle: 0,
                    changed,
                    discovered,
                    dropped,
                }
            }
        };

        *self.index.write() = IdentityIndex::from_records(records).with_metric_names(&self.names);
        self.health.record_success();

        let birth = self.birth_metrics();
        info!(
            mode = mode.as_str(),
            known = birth.len(),
            indexed = self.indexed_records(),
            changed = pending.changed.len(),
            discovered = pending.discovered.len(),
            "Engine bootstrapped"
        );
        Ok(Bootstrap { birth, pending })
    }

    // =========================================================================
    // Cycle
    // =========================================================================

    /// Runs one PULL, RECONCILE, EMIT cycle.
    ///
    /// Fails with [`BridgeError::Cancelled`] after [`SyncEngine::cancel`], with
    /// [`BridgeError::CycleInProgress`] while another cycle runs, and with
    /// [`BridgeError::Source`] when the pull fails or times out. In every
    /// failure case the state store is untouched.
    pub async fn run_cycle(&self) -> BridgeResult<CycleBatch> {
        self.ensure_running()?;
        let _cycle = self
            .cycle_gate
            .try_lock()
            .map_err(|_| BridgeError::CycleInProgress)?;

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        // PULL
        let records = self.pull().await?;

        // RECONCILE
        let candidates = self.candidates(&records);
        let (metrics, dropped) = self.convert(candidates.into_iter());
        let (changed, discovered) = {
            let mut store = self.state.write();
            let changed = self.detector.detect_changes(&metrics, &mut store);
            // Discoveries whose birth failed stay unknown and are offered again.
            let discovered = self.detector.detect_new_metrics(&metrics, &[], &store);
            (changed, discovered)
        };

        // EMIT
        *self.index.write() = IdentityIndex::from_records(records).with_metric_names(&self.names);
        self.health.record_success();

        let batch = CycleBatch {
            cycle,
            changed,
            discovered,
            dropped,
        };
        debug!(
            cycle,
            changed = batch.changed.len(),
            discovered = batch.discovered.len(),
            dropped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );
        Ok(batch)
    }

    /// Merges accepted new metrics into the store.
    ///
    /// Known names and lifecycle names are left alone. Returns the number added.
    pub fn accept_discovered(&self, metrics: impl IntoIterator<Item = Metric>) -> usize {
        let mut store = self.state.write();
        let added = metrics
            .into_iter()
            .filter(|metric| store.insert_new(metric.clone()))
            .count();
        if added > 0 {
            info!(added, known = store.len(), "Accepted new metrics");
        }
        added
    }

    // =========================================================================
    // Writeback
    // =========================================================================

    /// Writes metrics back into the tag source.
    ///
    /// Each metric is converted on its own; a failing conversion or write
    /// skips only that record. A metric whose name belongs to an indexed tag
    /// becomes an update of that tag, converted to the tag's type. Any other
    /// metric becomes an insert. Written values are folded into the store as
    /// the source will report them, so the next cycle does not echo them back.
    pub async fn apply_outgoing(&self, metrics: &[Metric]) -> WritebackReport {
        let _writes = self.writeback_gate.read().await;
        let mut report = WritebackReport::default();

        let mut updates = Vec::new();
        let mut inserts = Vec::new();
        let mut sent: HashMap<String, Metric> = HashMap::new();
        {
            let index = self.index.read();
            for metric in metrics {
                if is_lifecycle_metric(&metric.name) || metric.name == SCAN_RATE {
                    debug!(name = %metric.name, "Command metric is not written back");
                    report.skipped += 1;
                    continue;
                }

                let (outgoing, existing) = match index.find_by_metric(&metric.name) {
                    Some(tag) => (self.adapter.metric_to_tag_update(metric, tag), true),
                    None => (self.adapter.metric_to_tag_write(metric, &self.names), false),
                };
                let outgoing = match outgoing {
                    Ok(outgoing) => outgoing,
                    Err(e) => {
                        self.log_transform_error(&metric.name, &e);
                        report.skipped += 1;
                        continue;
                    }
                };
                if outgoing.lossy {
                    warn!(
                        name = %metric.name,
                        from = %metric.data_type,
                        to = %outgoing.write.data_type,
                        "Precision may be lost writing to source"
                    );
                }

                sent.insert(outgoing.write.name.clone(), outgoing.stored);
                if existing {
                    updates.push(outgoing.write);
                } else {
                    inserts.push(outgoing.write);
                }
            }
        }

        let mut outcomes = Vec::with_capacity(updates.len() + inserts.len());
        if !updates.is_empty() {
            outcomes.extend(self.writer.update_existing(&updates).await);
        }
        if !inserts.is_empty() {
            info!(count = inserts.len(), "Inserting new tags into source");
            outcomes.extend(self.writer.insert_new(&inserts).await);
        }

        let mut written = Vec::new();
        for (name, result) in outcomes {
            match result {
                Ok(()) => {
                    report.written += 1;
                    if let Some(metric) = sent.remove(&name) {
                        written.push(metric);
                    }
                }
                Err(e) => {
                    warn!(tag = %name, error = %e, "Writeback failed");
                    report.failed += 1;
                }
            }
        }

        if !written.is_empty() {
            let mut store = self.state.write();
            self.detector.detect_changes(&written, &mut store);
        }

        debug!(
            written = report.written,
            failed = report.failed,
            skipped = report.skipped,
            "Writeback complete"
        );
        report
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Saves the state once no cycle or writeback is in flight.
    pub async fn persist(&self) -> BridgeResult<()> {
        let _cycle = self.cycle_gate.lock().await;
        let _writes = self.writeback_gate.write().await;

        let mut store = self.state.write();
        self.persistence.save(&mut store)?;
        info!(
            path = %self.persistence.path().display(),
            metrics = store.len(),
            "State persisted"
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_running(&self) -> BridgeResult<()> {
        if self.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        Ok(())
    }

    async fn pull(&self) -> BridgeResult<Vec<TagRecord>> {
        let timeout = self.context.pull_timeout;
        let result = match tokio::time::timeout(timeout, self.source.pull_snapshot()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::timeout(timeout)),
        };

        result.map_err(|e| {
            let failures = self.health.record_failure(&e);
            if failures >= self.context.degraded_after {
                error!(
                    source = self.source.name(),
                    failures,
                    error = %e,
                    "Source unavailable, health degraded"
                );
            } else {
                warn!(source = self.source.name(), failures, error = %e, "Snapshot pull failed");
            }
            BridgeError::from(e)
        })
    }

    /// Records that changed since the previous pull plus records the store
    /// does not know yet.
    fn candidates<'a>(&self, records: &'a [TagRecord]) -> Vec<&'a TagRecord> {
        let index = self.index.read();
        let store = self.state.read();

        records
            .iter()
            .filter(|record| match self.reconciler.classify(record, &index) {
                Continuity::Changed { .. } | Continuity::New => true,
                Continuity::Unchanged { .. } => self
                    .names
                    .to_namespaced_name(&record.name)
                    .map(|name| !store.contains(&name))
                    .unwrap_or(true),
            })
            .collect()
    }

    fn convert<'a>(&self, records: impl Iterator<Item = &'a TagRecord>) -> (Vec<Metric>, usize) {
        let mut metrics = Vec::new();
        let mut dropped = 0;
        for record in records {
            match self.adapter.tag_to_metric(record, &self.names) {
                Ok(metric) => metrics.push(metric),
                Err(e) => {
                    self.log_transform_error(&record.name, &e);
                    dropped += 1;
                }
            }
        }
        (metrics, dropped)
    }

    fn log_transform_error(&self, name: &str, error: &TransformError) {
        match error {
            TransformError::MalformedName { .. } => {
                error!(name = %name, error = %error, "Dropping record with malformed name");
            }
            _ => {
                warn!(
                    name = %name,
                    error = %error,
                    error_type = error.error_type(),
                    "Dropping record that failed to transform"
                );
            }
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("node_id", &self.context.node_id)
            .field("source", &self.source.name())
            .field("known", &self.state.len())
            .field("indexed", &self.indexed_records())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! The runtime owns the poll loop around [`SyncEngine`]:
//!
//! - bootstrap and publish the birth set
//! - one reconciliation cycle per tick, deltas published as data
//! - discovered metrics published as a new birth and accepted on success
//! - inbound command batches split into triggers and writeback
//! - persist the state on shutdown

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tagbridge_config::schema::{MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
use tagbridge_config::{load_config, BridgeConfig};
use tagbridge_core::{
    BridgeError, CycleBatch, JsonSnapshotSource, Metric, MetricPublisher, NoOpTagWriter,
    PublishError, StartupMode, SyncEngine, TagSource, TagWriter, TracingPublisher, Trigger,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Capacity of the inbound command channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// RuntimeHandle
// =============================================================================

/// Cloneable handle for talking to a running [`BridgeRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Vec<Metric>>,
    shutdown: ShutdownCoordinator,
}

impl RuntimeHandle {
    /// Delivers an inbound command batch.
    ///
    /// Rebirth and scan rate metrics become triggers; everything else is
    /// written back into the tag source.
    pub async fn send_commands(&self, metrics: Vec<Metric>) -> BinResult<()> {
        self.commands
            .send(metrics)
            .await
            .map_err(|_| BinError::runtime("runtime is no longer accepting commands"))
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.initiate_shutdown();
    }

    /// Returns the shutdown coordinator.
    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }
}

// =============================================================================
// BridgeRuntime
// =============================================================================

enum Event {
    Shutdown,
    Tick,
    Commands(Vec<Metric>),
}

/// The poll loop around one engine and one publisher.
pub struct BridgeRuntime {
    config: Arc<BridgeConfig>,
    engine: Arc<SyncEngine>,
    publisher: Arc<dyn MetricPublisher>,
    shutdown: ShutdownCoordinator,
    commands_tx: mpsc::Sender<Vec<Metric>>,
    commands_rx: mpsc::Receiver<Vec<Metric>>,
    poll_interval: Duration,
}

impl BridgeRuntime {
    /// Returns a handle for commands and shutdown.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            commands: self.commands_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> Arc<SyncEngine> {
        self.engine.clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs until shutdown is signaled, then persists the state.
    pub async fn run(mut self) -> BinResult<()> {
        let started = Utc::now();
        let mode = self.config.sync.startup;
        info!(
            group = %self.config.node.group_id,
            node = %self.config.node.node_id,
            device = %self.config.node.device_id,
            startup = mode.as_str(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting tagbridge v{}",
            tagbridge_core::VERSION
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut ticker = build_interval(self.poll_interval);
        let mut bootstrapped = false;

        while !self.shutdown.is_shutdown_initiated() {
            let event = tokio::select! {
                _ = shutdown_rx.recv() => Event::Shutdown,
                _ = ticker.tick() => Event::Tick,
                Some(batch) = self.commands_rx.recv() => Event::Commands(batch),
            };

            match event {
                Event::Shutdown => break,
                Event::Tick if bootstrapped => self.tick().await,
                Event::Tick => bootstrapped = self.try_bootstrap(mode).await?,
                Event::Commands(batch) => {
                    if let Some(rate) = self.handle_commands(batch, bootstrapped).await {
                        self.poll_interval = rate;
                        ticker = build_interval(rate);
                    }
                }
            }
        }

        info!("Shutdown initiated, persisting state...");
        self.engine.cancel();
        let persisted = if bootstrapped {
            self.engine.persist().await.map_err(BinError::from)
        } else {
            debug!("Engine never bootstrapped, nothing to persist");
            Ok(())
        };

        let uptime = Utc::now() - started;
        info!(uptime_secs = uptime.num_seconds(), "tagbridge shutdown complete");
        persisted
    }

    /// Returns `Ok(true)` once bootstrapped. Retryable failures are retried on the next tick.
    async fn try_bootstrap(&self, mode: StartupMode) -> BinResult<bool> {
        match self.engine.bootstrap(mode).await {
            Ok(boot) => {
                info!(
                    metrics = boot.birth.len(),
                    indexed = self.engine.indexed_records(),
                    "Engine bootstrapped"
                );
                self.publish_birth(&boot.birth).await;
                if !boot.pending.is_empty() {
                    self.emit(boot.pending).await;
                }
                Ok(true)
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Bootstrap failed, retrying on next tick");
                Ok(false)
            }
            Err(BridgeError::Cancelled) => Ok(false),
            Err(e) => Err(BinError::from(e).with_context("bootstrap failed")),
        }
    }

    async fn tick(&self) {
        match self.engine.run_cycle().await {
            Ok(batch) => self.emit(batch).await,
            Err(BridgeError::CycleInProgress) => debug!("Previous cycle still running"),
            Err(BridgeError::Cancelled) => {}
            Err(e) => debug!(error = %e, "Cycle produced no batch"),
        }
    }

    /// Publishes a cycle's output.
    ///
    /// A rejected delta is not retried: its values are already in the store.
    /// The loss is counted in the engine health. Rejected discoveries stay
    /// unknown and are offered again by the next cycle.
    async fn emit(&self, batch: CycleBatch) {
        if !batch.changed.is_empty() {
            if let Err(e) = self.send_data(&batch.changed).await {
                let failures = self.engine.record_publish_failure(&e);
                warn!(
                    cycle = batch.cycle,
                    lost = batch.changed.len(),
                    failures,
                    error = %e,
                    "Failed to publish data"
                );
            }
        }

        if batch.discovered.is_empty() {
            return;
        }
        let discovered = batch.discovered_metrics();
        let mut birth = self.engine.birth_metrics();
        birth.extend(discovered.iter().cloned());
        birth.sort_by(|a, b| a.name.cmp(&b.name));

        match self.send_birth(&birth).await {
            Ok(()) => {
                self.engine.accept_discovered(discovered);
            }
            Err(e) => {
                self.engine.record_publish_failure(&e);
                warn!(
                    cycle = batch.cycle,
                    discovered = batch.discovered.len(),
                    error = %e,
                    "Birth with new metrics failed, they will be offered again"
                );
            }
        }
    }

    async fn publish_birth(&self, metrics: &[Metric]) {
        if let Err(e) = self.send_birth(metrics).await {
            self.engine.record_publish_failure(&e);
            error!(error = %e, "Failed to publish birth");
        }
    }

    async fn send_birth(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        if !self.publisher.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.publisher.publish_birth(metrics).await
    }

    async fn send_data(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        if !self.publisher.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.publisher.publish_data(metrics).await
    }

    /// Returns a new poll interval when a valid scan rate command arrived.
    async fn handle_commands(&self, batch: Vec<Metric>, bootstrapped: bool) -> Option<Duration> {
        let mut new_rate = None;
        let mut writes = Vec::new();

        for metric in batch {
            match Trigger::from_command(&metric) {
                Some(Trigger::NodeRebirth) | Some(Trigger::DeviceRebirth) if bootstrapped => {
                    info!(command = %metric.name, "Rebirth requested");
                    self.publish_birth(&self.engine.birth_metrics()).await;
                }
                Some(Trigger::NodeRebirth) | Some(Trigger::DeviceRebirth) => {
                    debug!(command = %metric.name, "Rebirth ignored before bootstrap");
                }
                Some(Trigger::SetScanRate(rate)) => match clamp_scan_rate(rate) {
                    Some(rate) => {
                        info!(scan_rate_ms = rate.as_millis() as u64, "Scan rate changed");
                        new_rate = Some(rate);
                    }
                    None => warn!(
                        scan_rate_ms = rate.as_millis() as u64,
                        "Scan rate outside {}..={}ms ignored",
                        MIN_POLL_INTERVAL_MS,
                        MAX_POLL_INTERVAL_MS
                    ),
                },
                None => writes.push(metric),
            }
        }

        if !writes.is_empty() {
            let report = self.engine.apply_outgoing(&writes).await;
            info!(
                written = report.written,
                failed = report.failed,
                skipped = report.skipped,
                "Applied inbound writes"
            );
        }
        new_rate
    }
}

fn build_interval(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn clamp_scan_rate(rate: Duration) -> Option<Duration> {
    let ms = rate.as_millis() as u64;
    (MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS)
        .contains(&ms)
        .then_some(rate)
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BridgeRuntime`].
///
/// Collaborators default to a [`JsonSnapshotSource`] on `source.snapshot_path`,
/// a [`NoOpTagWriter`] and a [`TracingPublisher`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<std::path::PathBuf>,
    config: Option<BridgeConfig>,
    source: Option<Arc<dyn TagSource>>,
    writer: Option<Arc<dyn TagWriter>>,
    publisher: Option<Arc<dyn MetricPublisher>>,
    shutdown: Option<ShutdownCoordinator>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the tag source.
    pub fn source(mut self, source: Arc<dyn TagSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the tag writer.
    pub fn writer(mut self, writer: Arc<dyn TagWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Sets the metric publisher.
    pub fn publisher(mut self, publisher: Arc<dyn MetricPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Shares an existing shutdown coordinator.
    pub fn shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<BridgeRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_config(&path).map_err(|e| {
                    BinError::from(e).with_context(format!("loading {}", path.display()))
                })?
            }
        };

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(JsonSnapshotSource::new(config.source.snapshot_path.clone())));
        let writer = self.writer.unwrap_or_else(|| Arc::new(NoOpTagWriter));
        let publisher = self.publisher.unwrap_or_else(|| {
            Arc::new(TracingPublisher::new(
                config.node.group_id.clone(),
                config.node.node_id.clone(),
            ))
        });

        let engine = SyncEngine::new(config.engine_context(), source, writer)
            .map_err(|e| BinError::init(format!("Failed to create engine: {}", e)))?;
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        Ok(BridgeRuntime {
            poll_interval: config.sync.poll_interval(),
            config: Arc::new(config),
            engine: Arc::new(engine),
            publisher,
            shutdown: self.shutdown.unwrap_or_default(),
            commands_tx,
            commands_rx,
        })
    }
}

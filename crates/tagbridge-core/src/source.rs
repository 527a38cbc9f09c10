// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Collaborator seams.
//!
//! The engine never talks to a database or a broker itself. It depends on
//! three traits:
//!
//! - [`TagSource`]: full snapshot pulls from the tag store
//! - [`TagWriter`]: writeback into the tag store
//! - [`MetricPublisher`]: birth and data publication in the metric namespace
//!
//! The implementations bundled here are enough to run the gateway against a
//! JSON file and observe its output through the log.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{PublishError, SourceError, WriteError};
use crate::types::{Metric, TagRecord, TagWrite};

// =============================================================================
// Traits
// =============================================================================

/// Pulls full snapshots from the tag store.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Returns a name for logging.
    fn name(&self) -> &str;

    /// Returns every tag currently in the store.
    ///
    /// A partial result must never be returned; any failure is an error.
    async fn pull_snapshot(&self) -> Result<Vec<TagRecord>, SourceError>;
}

/// Per-record result of a writeback call.
pub type WriteOutcome = (String, Result<(), WriteError>);

/// Writes values back into the tag store.
#[async_trait]
pub trait TagWriter: Send + Sync {
    /// Updates tags that already exist in the store.
    async fn update_existing(&self, records: &[TagWrite]) -> Vec<WriteOutcome>;

    /// Creates tags the store does not know yet.
    async fn insert_new(&self, records: &[TagWrite]) -> Vec<WriteOutcome>;
}

/// Publishes metric batches.
#[async_trait]
pub trait MetricPublisher: Send + Sync {
    /// Publishes the full metric set a node owns.
    async fn publish_birth(&self, metrics: &[Metric]) -> Result<(), PublishError>;

    /// Publishes a delta batch.
    async fn publish_data(&self, metrics: &[Metric]) -> Result<(), PublishError>;

    /// Returns `true` if the publisher can currently accept batches.
    fn is_connected(&self) -> bool {
        true
    }
}

// =============================================================================
// JsonSnapshotSource
// =============================================================================

/// Reads a JSON array of tag records from a file on every pull.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
    name: String,
}

impl JsonSnapshotSource {
    /// Creates a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl TagSource for JsonSnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pull_snapshot(&self) -> Result<Vec<TagRecord>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SourceError::unavailable_with(format!("cannot read {}", self.path.display()), e)
        })?;
        let records: Vec<TagRecord> = serde_json::from_str(&content).map_err(|e| {
            SourceError::unavailable_with(format!("cannot parse {}", self.path.display()), e)
        })?;
        debug!(source = %self.name, records = records.len(), "Snapshot pulled");
        Ok(records)
    }
}

// =============================================================================
// NoOpTagWriter
// =============================================================================

/// Accepts every write without touching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTagWriter;

#[async_trait]
impl TagWriter for NoOpTagWriter {
    async fn update_existing(&self, records: &[TagWrite]) -> Vec<WriteOutcome> {
        records.iter().map(|r| (r.name.clone(), Ok(()))).collect()
    }

    async fn insert_new(&self, records: &[TagWrite]) -> Vec<WriteOutcome> {
        records.iter().map(|r| (r.name.clone(), Ok(()))).collect()
    }
}

// =============================================================================
// TracingPublisher
// =============================================================================

/// Logs every batch instead of sending it anywhere.
#[derive(Debug, Clone)]
pub struct TracingPublisher {
    group_id: String,
    node_id: String,
}

impl TracingPublisher {
    /// Creates a publisher for a group and node.
    pub fn new(group_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            node_id: node_id.into(),
        }
    }
}

#[async_trait]
impl MetricPublisher for TracingPublisher {
    async fn publish_birth(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        info!(group = %self.group_id, node = %self.node_id, metrics = metrics.len(), "BIRTH");
        for metric in metrics {
            debug!(name = %metric.name, value = %metric.value, "birth metric");
        }
        Ok(())
    }

    async fn publish_data(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        info!(group = %self.group_id, node = %self.node_id, metrics = metrics.len(), "DATA");
        for metric in metrics {
            debug!(name = %metric.name, value = %metric.value, "data metric");
        }
        Ok(())
    }
}

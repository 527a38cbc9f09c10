// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock collaborators for driving the engine and runtime in isolation.
//!
//! - [`MockTagSource`]: an editable tag table with failure and latency switches
//! - [`MockTagWriter`]: records writes, optionally applies them to a source
//! - [`MockPublisher`]: records birth and data batches

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tagbridge_core::{
    Metric, MetricPublisher, PublishError, SourceDataType, SourceError, TagRecord, TagSource,
    TagWrite, TagWriter, WriteError, WriteOutcome,
};

// =============================================================================
// Mock Tag Source
// =============================================================================

/// An in-memory tag table served as full snapshots.
#[derive(Debug, Default)]
pub struct MockTagSource {
    records: Mutex<Vec<TagRecord>>,
    latency: Mutex<Duration>,
    fail_next_pull: AtomicBool,
    fail_all_pulls: AtomicBool,
    pull_count: AtomicU64,
}

impl MockTagSource {
    /// Creates a source serving `records`.
    pub fn new(records: Vec<TagRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Replaces the whole table.
    pub fn set_records(&self, records: Vec<TagRecord>) {
        *self.records.lock() = records;
    }

    /// Returns a copy of the table.
    pub fn records(&self) -> Vec<TagRecord> {
        self.records.lock().clone()
    }

    /// Sets the value of every record named `name`. Returns `false` if none matched.
    pub fn set_value(&self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let mut records = self.records.lock();
        let mut found = false;
        for record in records.iter_mut().filter(|r| r.name == name) {
            record.value = value.clone();
            found = true;
        }
        found
    }

    /// Appends a record.
    pub fn add_record(&self, record: TagRecord) {
        self.records.lock().push(record);
    }

    /// Returns the next free id.
    pub fn next_id(&self) -> i64 {
        self.records.lock().iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Adds `offset` to every id, as a source rebuild would.
    pub fn shift_ids(&self, offset: i64) {
        for record in self.records.lock().iter_mut() {
            record.id += offset;
        }
    }

    /// Sets the simulated pull latency.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Fails the next pull only.
    pub fn fail_next_pull(&self) {
        self.fail_next_pull.store(true, Ordering::SeqCst);
    }

    /// Fails every pull until switched off.
    pub fn fail_all_pulls(&self, fail: bool) {
        self.fail_all_pulls.store(fail, Ordering::SeqCst);
    }

    /// Number of pulls attempted.
    pub fn pull_count(&self) -> u64 {
        self.pull_count.load(Ordering::SeqCst)
    }

    fn apply(&self, write: &TagWrite) -> bool {
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.name == write.name) {
            Some(record) => {
                record.value = write.value.clone();
                if let Some(quality) = write.quality {
                    record.quality = quality;
                }
                true
            }
            None => false,
        }
    }

    fn insert(&self, write: &TagWrite) {
        let mut records = self.records.lock();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(
            TagRecord::new(id, write.name.clone(), write.value.clone(), write.data_type)
                .with_quality(write.quality.unwrap_or(0)),
        );
    }
}

#[async_trait]
impl TagSource for MockTagSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn pull_snapshot(&self) -> Result<Vec<TagRecord>, SourceError> {
        self.pull_count.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.fail_all_pulls.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable("mock source offline"));
        }
        if self.fail_next_pull.swap(false, Ordering::SeqCst) {
            return Err(SourceError::unavailable("mock single pull failure"));
        }

        Ok(self.records.lock().clone())
    }
}

// =============================================================================
// Mock Tag Writer
// =============================================================================

/// Records writeback calls and rejects configured names.
#[derive(Debug, Default)]
pub struct MockTagWriter {
    target: Option<Arc<MockTagSource>>,
    rejected: Mutex<HashSet<String>>,
    updates: Mutex<Vec<TagWrite>>,
    inserts: Mutex<Vec<TagWrite>>,
}

impl MockTagWriter {
    /// Creates a writer that only records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer that also applies accepted writes to `source`.
    pub fn linked(source: Arc<MockTagSource>) -> Self {
        Self {
            target: Some(source),
            ..Self::default()
        }
    }

    /// Rejects every write to `name`.
    pub fn reject(&self, name: impl Into<String>) {
        self.rejected.lock().insert(name.into());
    }

    /// Accepted and rejected updates, in call order.
    pub fn updates(&self) -> Vec<TagWrite> {
        self.updates.lock().clone()
    }

    /// Accepted and rejected inserts, in call order.
    pub fn inserts(&self) -> Vec<TagWrite> {
        self.inserts.lock().clone()
    }

    fn outcome(&self, write: &TagWrite) -> Result<(), WriteError> {
        if self.rejected.lock().contains(&write.name) {
            return Err(WriteError::new(&write.name, "rejected by mock writer"));
        }
        Ok(())
    }
}

#[async_trait]
impl TagWriter for MockTagWriter {
    async fn update_existing(&self, records: &[TagWrite]) -> Vec<WriteOutcome> {
        self.updates.lock().extend_from_slice(records);
        records
            .iter()
            .map(|write| {
                let result = self.outcome(write).and_then(|()| match &self.target {
                    Some(source) if !source.apply(write) => {
                        Err(WriteError::new(&write.name, "tag does not exist"))
                    }
                    _ => Ok(()),
                });
                (write.name.clone(), result)
            })
            .collect()
    }

    async fn insert_new(&self, records: &[TagWrite]) -> Vec<WriteOutcome> {
        self.inserts.lock().extend_from_slice(records);
        records
            .iter()
            .map(|write| {
                let result = self.outcome(write);
                if result.is_ok() {
                    if let Some(source) = &self.target {
                        source.insert(write);
                    }
                }
                (write.name.clone(), result)
            })
            .collect()
    }
}

// =============================================================================
// Mock Publisher
// =============================================================================

/// Records every published batch.
#[derive(Debug)]
pub struct MockPublisher {
    births: Mutex<Vec<Vec<Metric>>>,
    data: Mutex<Vec<Vec<Metric>>>,
    fail_births: AtomicBool,
    connected: AtomicBool,
}

impl MockPublisher {
    /// Creates a connected publisher.
    pub fn new() -> Self {
        Self {
            births: Mutex::new(Vec::new()),
            data: Mutex::new(Vec::new()),
            fail_births: AtomicBool::new(false),
            connected: AtomicBool::new(true),
        }
    }

    /// Makes birth publication fail until switched off.
    pub fn fail_births(&self, fail: bool) {
        self.fail_births.store(fail, Ordering::SeqCst);
    }

    /// Sets the connection state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Births published so far.
    pub fn births(&self) -> Vec<Vec<Metric>> {
        self.births.lock().clone()
    }

    /// Data batches published so far.
    pub fn data_batches(&self) -> Vec<Vec<Metric>> {
        self.data.lock().clone()
    }

    /// The most recent birth.
    pub fn last_birth(&self) -> Option<Vec<Metric>> {
        self.births.lock().last().cloned()
    }

    /// Every data metric in publication order.
    pub fn published_data(&self) -> Vec<Metric> {
        self.data.lock().iter().flatten().cloned().collect()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricPublisher for MockPublisher {
    async fn publish_birth(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        if self.fail_births.load(Ordering::SeqCst) {
            return Err(PublishError::failed("mock birth failure"));
        }
        self.births.lock().push(metrics.to_vec());
        Ok(())
    }

    async fn publish_data(&self, metrics: &[Metric]) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.data.lock().push(metrics.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================

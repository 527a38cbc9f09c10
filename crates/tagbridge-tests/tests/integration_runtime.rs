// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Runtime Integration Tests
//!
//! The poll loop running against mock collaborators, observed through the
//! publisher it feeds.

use std::future::ready;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use tagbridge_bin::{BinResult, RuntimeBuilder, RuntimeHandle};
use tagbridge_core::lifecycle::{NODE_REBIRTH, SCAN_RATE};
use tagbridge_core::{Metric, SourceDataType, StatePersistence, SyncEngine, TagRecord};
use tagbridge_tests::prelude::*;

const WAIT: Duration = Duration::from_secs(3);

struct Harness {
    dir: tempfile::TempDir,
    handle: RuntimeHandle,
    engine: Arc<SyncEngine>,
    source: Arc<MockTagSource>,
    writer: Arc<MockTagWriter>,
    publisher: Arc<MockPublisher>,
    task: JoinHandle<BinResult<()>>,
}

impl Harness {
    fn start(poll_interval_ms: u64) -> Self {
        init_test_logging();
        let dir = temp_test_dir("runtime");
        let mut config = ConfigFixtures::bridge_config(dir.path());
        config.sync.poll_interval_ms = poll_interval_ms;

        let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
        let writer = Arc::new(MockTagWriter::linked(source.clone()));
        let publisher = Arc::new(MockPublisher::new());

        let runtime = RuntimeBuilder::new()
            .config(config)
            .source(source.clone())
            .writer(writer.clone())
            .publisher(publisher.clone())
            .build()
            .unwrap();
        let handle = runtime.handle();
        let engine = runtime.engine();
        let task = tokio::spawn(runtime.run());

        Self {
            dir,
            handle,
            engine,
            source,
            writer,
            publisher,
            task,
        }
    }

    async fn started(poll_interval_ms: u64) -> Self {
        let harness = Self::start(poll_interval_ms);
        let publisher = harness.publisher.clone();
        assert!(
            eventually(WAIT, || ready(!publisher.births().is_empty())).await,
            "runtime never published its birth"
        );
        harness
    }

    async fn stop(self) -> tempfile::TempDir {
        self.handle.shutdown();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("runtime should stop")
            .expect("runtime task should not panic")
            .expect("runtime should stop cleanly");
        self.dir
    }
}

#[tokio::test]
async fn test_runtime_publishes_birth_then_changes() {
    let harness = Harness::started(20).await;

    let birth = harness.publisher.last_birth().unwrap();
    assert_eq!(birth.len(), 4 + 5);
    assert_metric(&birth, "Line1/_N1/Product", "SKU-100");

    harness.source.set_value("Line1.Product", "SKU-200");
    let publisher = harness.publisher.clone();
    assert!(eventually(WAIT, || ready(!publisher.published_data().is_empty())).await);

    let data = harness.publisher.published_data();
    assert_eq!(data.len(), 1);
    assert_metric(&data, "Line1/_N1/Product", "SKU-200");
    assert_eq!(harness.publisher.births().len(), 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_rebirths_on_discovery() {
    let harness = Harness::started(20).await;

    harness.source.add_record(TagRecord::new(
        harness.source.next_id(),
        "Line1.Temperature",
        "68.5",
        SourceDataType::Double,
    ));

    let engine = harness.engine.clone();
    assert!(eventually(WAIT, || ready(engine.state().contains("Line1/_N1/Temperature"))).await);

    let birth = harness.publisher.last_birth().unwrap();
    assert_eq!(birth.len(), 4 + 5 + 1);
    assert_metric(&birth, "Line1/_N1/Temperature", 68.5);
    assert!(birth.windows(2).all(|pair| pair[0].name <= pair[1].name));

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_reoffers_discovery_after_failed_birth() {
    let harness = Harness::started(20).await;
    harness.publisher.fail_births(true);

    harness.source.add_record(TagRecord::new(
        harness.source.next_id(),
        "Line1.Pressure",
        "2.1",
        SourceDataType::Double,
    ));

    let source = harness.source.clone();
    let pulls = source.pull_count();
    assert!(eventually(WAIT, || ready(source.pull_count() >= pulls + 5)).await);
    assert!(!harness.engine.state().contains("Line1/_N1/Pressure"));

    harness.publisher.fail_births(false);
    let engine = harness.engine.clone();
    assert!(eventually(WAIT, || ready(engine.state().contains("Line1/_N1/Pressure"))).await);
    assert_eq!(harness.publisher.births().len(), 2);

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_counts_lost_data_while_disconnected() {
    let harness = Harness::started(20).await;
    harness.publisher.set_connected(false);

    harness.source.set_value("Line1.Count", "421");
    let engine = harness.engine.clone();
    assert!(eventually(WAIT, || ready(engine.health().publish_failures >= 1)).await);

    assert!(harness.publisher.published_data().is_empty());
    assert_known(&harness.engine.state_snapshot(), "Line1/_N1/Count", 421);
    let health = harness.engine.health();
    assert_eq!(health.last_error.as_deref(), Some("Publisher is not connected"));
    assert!(!health.degraded);

    harness.publisher.set_connected(true);
    harness.source.set_value("Line1.Count", "422");
    let publisher = harness.publisher.clone();
    assert!(eventually(WAIT, || ready(!publisher.published_data().is_empty())).await);
    assert_metric(&harness.publisher.published_data(), "Line1/_N1/Count", 422);
    assert_eq!(harness.engine.health().publish_failures, 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_rebirth_command() {
    let harness = Harness::started(20).await;

    harness
        .handle
        .send_commands(vec![Metric::new(NODE_REBIRTH, true)])
        .await
        .unwrap();

    let publisher = harness.publisher.clone();
    assert!(eventually(WAIT, || ready(publisher.births().len() == 2)).await);
    assert_eq!(
        harness.publisher.births()[0].len(),
        harness.publisher.births()[1].len()
    );
    assert!(harness.writer.updates().is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_scan_rate_command() {
    // One hour between polls: only the bootstrap tick fires on its own.
    let harness = Harness::started(3_600_000).await;
    let pulls = harness.source.pull_count();

    harness.source.set_value("Line1.Speed", "15.0");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.publisher.published_data().is_empty());
    assert_eq!(harness.source.pull_count(), pulls);

    harness
        .handle
        .send_commands(vec![Metric::new(SCAN_RATE, 20i64)])
        .await
        .unwrap();

    let publisher = harness.publisher.clone();
    assert!(eventually(WAIT, || ready(!publisher.published_data().is_empty())).await);
    assert_metric(&harness.publisher.published_data(), "Line1/_N1/Speed", 15.0);

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_writeback_command() {
    let harness = Harness::started(20).await;

    harness
        .handle
        .send_commands(vec![Metric::new("Line1/_N1/Speed", 30.0)])
        .await
        .unwrap();

    let writer = harness.writer.clone();
    assert!(eventually(WAIT, || ready(!writer.updates().is_empty())).await);
    assert_eq!(harness.writer.updates()[0].name, "Line1.Speed");

    // Give the loop a few cycles to pick the written value up.
    let source = harness.source.clone();
    let pulls = source.pull_count();
    assert!(eventually(WAIT, || ready(source.pull_count() >= pulls + 3)).await);

    assert!(harness.publisher.published_data().is_empty());
    assert_known(&harness.engine.state_snapshot(), "Line1/_N1/Speed", 30.0);

    harness.stop().await;
}

#[tokio::test]
async fn test_runtime_shutdown_persists_state() {
    let harness = Harness::started(20).await;

    harness.source.set_value("Line1.Count", "777");
    let publisher = harness.publisher.clone();
    assert!(eventually(WAIT, || ready(!publisher.published_data().is_empty())).await);

    let engine = harness.engine.clone();
    let dir = harness.stop().await;

    assert!(engine.is_cancelled());
    let persisted = StatePersistence::new(dir.path().join("knownMetrics.json")).load();
    assert_known(&persisted, "Line1/_N1/Count", 777);
}

#[tokio::test]
async fn test_runtime_retries_bootstrap() {
    init_test_logging();
    let dir = temp_test_dir("runtime-retry");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let publisher = Arc::new(MockPublisher::new());
    source.fail_all_pulls(true);

    let runtime = RuntimeBuilder::new()
        .config(ConfigFixtures::bridge_config(dir.path()))
        .source(source.clone())
        .publisher(publisher.clone())
        .build()
        .unwrap();
    let handle = runtime.handle();
    let task = tokio::spawn(runtime.run());

    let pulled = source.clone();
    assert!(eventually(WAIT, || ready(pulled.pull_count() >= 3)).await);
    assert!(publisher.births().is_empty());

    source.fail_all_pulls(false);
    let announced = publisher.clone();
    assert!(eventually(WAIT, || ready(!announced.births().is_empty())).await);

    handle.shutdown();
    let result = tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
}

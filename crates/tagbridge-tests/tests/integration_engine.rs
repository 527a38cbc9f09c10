// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Engine Integration Tests
//!
//! The sync engine driven end to end through mock collaborators:
//!
//! - `test_bootstrap_*`: baseline and resume startup
//! - `test_cycle_*`: change detection, identity churn and discovery
//! - `test_pull_*`: failure, timeout and health
//! - `test_writeback_*`: outgoing metrics into the tag source

use std::sync::Arc;
use std::time::Duration;

use tagbridge_core::lifecycle::{BD_SEQ, NODE_REBIRTH, SCAN_RATE};
use tagbridge_core::{
    BridgeError, Metric, MetricDataType, MetricValue, SourceError, StartupMode, SyncEngine,
    TagRecord, WritebackReport,
};
use tagbridge_tests::prelude::*;

fn engine_with(
    dir: &tempfile::TempDir,
    source: Arc<MockTagSource>,
    writer: Arc<MockTagWriter>,
) -> SyncEngine {
    init_test_logging();
    SyncEngine::new(ConfigFixtures::engine_context(dir.path()), source, writer).unwrap()
}

async fn bootstrapped(dir: &tempfile::TempDir) -> (SyncEngine, Arc<MockTagSource>, Arc<MockTagWriter>) {
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let writer = Arc::new(MockTagWriter::linked(source.clone()));
    let engine = engine_with(dir, source.clone(), writer.clone());
    engine.bootstrap(StartupMode::Baseline).await.unwrap();
    (engine, source, writer)
}

// =============================================================================
// Bootstrap
// =============================================================================

#[tokio::test]
async fn test_bootstrap_baseline_announces_every_tag() {
    let dir = temp_test_dir("engine-baseline");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let engine = engine_with(&dir, source, Arc::new(MockTagWriter::new()));

    let boot = engine.bootstrap(StartupMode::Baseline).await.unwrap();

    assert_eq!(boot.birth.len(), 4 + 5);
    assert!(boot.pending.is_empty());
    assert_metric(&boot.birth, "Line1/_N1/Speed", 12.5);
    assert_metric(&boot.birth, "Line1/_N1/Running", true);
    assert_metric(&boot.birth, "Line1/_N1/Product", "SKU-100");
    assert_metric(&boot.birth, "Line1/_N1/Count", 420);
    assert_metric(&boot.birth, NODE_REBIRTH, true);
    assert_metric(&boot.birth, BD_SEQ, 0u64);

    let count = boot.birth.iter().find(|m| m.name == "Line1/_N1/Count").unwrap();
    assert_eq!(count.data_type, MetricDataType::Int32);
    assert_eq!(count.quality(), Some(192));

    assert!(dir.path().join("knownMetrics.json").exists());
    assert_eq!(engine.indexed_records(), 4);
}

#[tokio::test]
async fn test_bootstrap_resume_reports_offline_changes() {
    let dir = temp_test_dir("engine-resume");
    {
        let (engine, _, _) = bootstrapped(&dir).await;
        engine.persist().await.unwrap();
    }

    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    source.set_value("Line1.Speed", "14.0");
    source.add_record(TagRecord::new(
        5,
        "Line1.Temperature",
        "71.5",
        tagbridge_core::SourceDataType::Double,
    ));
    let engine = engine_with(&dir, source, Arc::new(MockTagWriter::new()));

    let boot = engine.bootstrap(StartupMode::Resume).await.unwrap();

    assert_eq!(boot.pending.changed.len(), 1);
    assert_metric(&boot.pending.changed, "Line1/_N1/Speed", 14.0);
    assert!(boot.pending.discovered.contains_key("Line1/_N1/Temperature"));
    assert_known(&engine.state_snapshot(), "Line1/_N1/Speed", 14.0);
    assert!(!engine.state().contains("Line1/_N1/Temperature"));
}

#[tokio::test]
async fn test_bootstrap_hierarchical_names() {
    let dir = temp_test_dir("engine-isa");
    let source = Arc::new(MockTagSource::new(vec![TagFixtures::hierarchical()]));
    let engine = engine_with(&dir, source, Arc::new(MockTagWriter::new()));

    let boot = engine.bootstrap(StartupMode::Baseline).await.unwrap();

    assert_metric(
        &boot.birth,
        "Acme\\Dallas\\Packaging\\Line2\\Filler/_N1\\Motor\\Speed",
        1450,
    );
}

// =============================================================================
// Cycles
// =============================================================================

#[tokio::test]
async fn test_cycle_emits_only_changes() {
    let dir = temp_test_dir("engine-changes");
    let (engine, source, _) = bootstrapped(&dir).await;

    assert!(engine.run_cycle().await.unwrap().is_empty());

    source.set_value("Line1.Speed", "13.25");
    source.set_value("Line1.Running", "false");
    let batch = engine.run_cycle().await.unwrap();

    assert_eq!(batch.changed.len(), 2);
    assert_metric(&batch.changed, "Line1/_N1/Speed", 13.25);
    assert_metric(&batch.changed, "Line1/_N1/Running", false);
    assert_known(&engine.state_snapshot(), "Line1/_N1/Speed", 13.25);

    assert!(engine.run_cycle().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cycle_same_value_in_new_spelling_is_not_a_change() {
    let dir = temp_test_dir("engine-spelling");
    let (engine, source, _) = bootstrapped(&dir).await;

    source.set_value("Line1.Running", "TRUE");
    source.set_value("Line1.Speed", " 12.50 ");

    assert!(engine.run_cycle().await.unwrap().changed.is_empty());
}

#[tokio::test]
async fn test_cycle_survives_id_churn() {
    let dir = temp_test_dir("engine-churn");
    let (engine, source, _) = bootstrapped(&dir).await;

    source.shift_ids(1000);
    let batch = engine.run_cycle().await.unwrap();
    assert!(batch.is_empty(), "renumbered ids must not look like changes: {batch:?}");

    source.shift_ids(-500);
    source.set_value("Line1.Count", "421");
    let batch = engine.run_cycle().await.unwrap();
    assert_eq!(batch.changed.len(), 1);
    assert_metric(&batch.changed, "Line1/_N1/Count", 421);
    assert!(batch.discovered.is_empty());
}

#[tokio::test]
async fn test_cycle_discovery_until_accepted() {
    let dir = temp_test_dir("engine-discovery");
    let (engine, source, _) = bootstrapped(&dir).await;

    source.add_record(TagRecord::new(
        source.next_id(),
        "Line1.Temperature",
        "70.0",
        tagbridge_core::SourceDataType::Double,
    ));

    let first = engine.run_cycle().await.unwrap();
    assert!(first.changed.is_empty());
    assert_eq!(first.discovered.len(), 1);

    let offered_again = engine.run_cycle().await.unwrap();
    assert_eq!(offered_again.discovered.len(), 1);

    assert_eq!(engine.accept_discovered(offered_again.discovered_metrics()), 1);
    assert_eq!(engine.accept_discovered(offered_again.discovered_metrics()), 0);
    assert!(engine.run_cycle().await.unwrap().is_empty());

    source.set_value("Line1.Temperature", "72.0");
    let batch = engine.run_cycle().await.unwrap();
    assert_metric(&batch.changed, "Line1/_N1/Temperature", 72.0);
}

#[tokio::test]
async fn test_cycle_drops_unconvertible_records() {
    let dir = temp_test_dir("engine-dropped");
    let (engine, source, _) = bootstrapped(&dir).await;

    source.add_record(TagFixtures::unparsable());
    source.set_value("Line1.Speed", "1.0");
    let batch = engine.run_cycle().await.unwrap();

    assert_eq!(batch.dropped, 1);
    assert_eq!(batch.changed.len(), 1);
    assert!(batch.discovered.is_empty());
}

#[tokio::test]
async fn test_cycle_large_table() {
    let dir = temp_test_dir("engine-large");
    let source = Arc::new(MockTagSource::new(TagFixtures::batch(500)));
    let engine = engine_with(&dir, source.clone(), Arc::new(MockTagWriter::new()));
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    source.set_value("Line9.Sensor250", "9999.5");
    let batch = engine.run_cycle().await.unwrap();

    assert_eq!(engine.state().len(), 505);
    assert_eq!(batch.changed.len(), 1);
    assert_metric(&batch.changed, "Line9/_N1/Sensor250", 9999.5);
}

#[tokio::test]
async fn test_cycle_overlap_is_refused() {
    let dir = temp_test_dir("engine-overlap");
    let (engine, source, _) = bootstrapped(&dir).await;
    source.set_latency(Duration::from_millis(100));

    let (first, second) = tokio::join!(engine.run_cycle(), engine.run_cycle());

    assert!(first.is_ok());
    assert!(matches!(second, Err(BridgeError::CycleInProgress)));
}

#[tokio::test]
async fn test_cycle_after_cancel() {
    let dir = temp_test_dir("engine-cancel");
    let (engine, source, _) = bootstrapped(&dir).await;

    engine.cancel();
    let pulls = source.pull_count();

    assert!(matches!(engine.run_cycle().await, Err(BridgeError::Cancelled)));
    assert_eq!(source.pull_count(), pulls);
    assert!(engine.persist().await.is_ok());
}

// =============================================================================
// Pull failures
// =============================================================================

#[tokio::test]
async fn test_pull_failure_leaves_state_untouched() {
    let dir = temp_test_dir("engine-failure");
    let (engine, source, _) = bootstrapped(&dir).await;
    let before = engine.state_snapshot();

    source.set_value("Line1.Speed", "99.0");
    source.fail_next_pull();

    let result = engine.run_cycle().await;
    assert!(matches!(result, Err(BridgeError::Source(SourceError::Unavailable { .. }))));
    assert_eq!(engine.state_snapshot(), before);
    assert_eq!(engine.health().consecutive_failures, 1);

    let batch = engine.run_cycle().await.unwrap();
    assert_metric(&batch.changed, "Line1/_N1/Speed", 99.0);
    assert_eq!(engine.health().consecutive_failures, 0);
}

#[tokio::test]
async fn test_pull_timeout() {
    let dir = temp_test_dir("engine-timeout");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let context = ConfigFixtures::engine_context(dir.path()).with_pull_timeout(Duration::from_millis(30));
    let engine = SyncEngine::new(context, source.clone(), Arc::new(MockTagWriter::new())).unwrap();
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    source.set_latency(Duration::from_millis(300));
    let result = engine.run_cycle().await;

    assert!(matches!(result, Err(BridgeError::Source(SourceError::Timeout { .. }))));
}

#[tokio::test]
async fn test_pull_health_degrades_and_recovers() {
    let dir = temp_test_dir("engine-health");
    let (engine, source, _) = bootstrapped(&dir).await;

    source.fail_all_pulls(true);
    for _ in 0..3 {
        assert!(engine.run_cycle().await.is_err());
    }
    let health = engine.health();
    assert!(health.degraded);
    assert_eq!(health.consecutive_failures, 3);
    assert!(health.last_error.is_some());

    source.fail_all_pulls(false);
    engine.run_cycle().await.unwrap();
    let health = engine.health();
    assert!(!health.degraded);
    assert!(health.last_success.is_some());
}

// =============================================================================
// Writeback
// =============================================================================

#[tokio::test]
async fn test_writeback_updates_and_inserts() {
    let dir = temp_test_dir("engine-writeback");
    let (engine, source, writer) = bootstrapped(&dir).await;

    let report = engine
        .apply_outgoing(&[
            Metric::new("Line1/_N1/Speed", 20.0),
            Metric::new("Line1/_N1/Setpoint", 5i32),
        ])
        .await;

    assert_eq!(
        report,
        WritebackReport {
            written: 2,
            failed: 0,
            skipped: 0
        }
    );
    assert_eq!(writer.updates().len(), 1);
    assert_eq!(writer.updates()[0].name, "Line1.Speed");
    assert_eq!(writer.inserts().len(), 1);
    assert_eq!(writer.inserts()[0].name, "Line1.Setpoint");
    assert_eq!(source.records().len(), 5);

    let batch = engine.run_cycle().await.unwrap();
    assert!(batch.changed.is_empty(), "written values must not echo: {batch:?}");
    assert!(batch.discovered.contains_key("Line1/_N1/Setpoint"));
}

#[tokio::test]
async fn test_writeback_isolates_failures() {
    let dir = temp_test_dir("engine-writeback-fail");
    let (engine, _, writer) = bootstrapped(&dir).await;
    writer.reject("Line1.Running");

    let report = engine
        .apply_outgoing(&[
            Metric::new("Line1/_N1/Running", false),
            Metric::new("Line1/_N1/Product", "SKU-200"),
            Metric::new(NODE_REBIRTH, true),
            Metric::new(SCAN_RATE, 500i64),
            Metric::new("Line1/_N1/Speed", MetricValue::Null),
        ])
        .await;

    assert_eq!(report.written, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 3);

    let snapshot = engine.state_snapshot();
    assert_known(&snapshot, "Line1/_N1/Product", "SKU-200");
    assert_known(&snapshot, "Line1/_N1/Running", true);
}

#[tokio::test]
async fn test_writeback_wide_integer_is_lossy_double() {
    let dir = temp_test_dir("engine-writeback-wide");
    let (engine, _, writer) = bootstrapped(&dir).await;

    let report = engine
        .apply_outgoing(&[Metric::new("Line1/_N1/Speed", 9_000_000_000i64)])
        .await;

    assert_eq!(report.written, 1);
    let update = &writer.updates()[0];
    assert_eq!(update.data_type, tagbridge_core::SourceDataType::Double);
    assert_eq!(update.value.parse::<f64>().unwrap(), 9_000_000_000.0);
}

#[tokio::test]
async fn test_writeback_hierarchical_tag_updates_in_place() {
    let dir = temp_test_dir("engine-writeback-isa");
    let source = Arc::new(MockTagSource::new(vec![TagFixtures::hierarchical()]));
    let writer = Arc::new(MockTagWriter::linked(source.clone()));
    let engine = engine_with(&dir, source.clone(), writer.clone());
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    let metric_name = "Acme\\Dallas\\Packaging\\Line2\\Filler/_N1\\Motor\\Speed";
    let report = engine.apply_outgoing(&[Metric::new(metric_name, 1500)]).await;

    assert_eq!(report.written, 1);
    assert!(writer.inserts().is_empty());
    assert_eq!(writer.updates().len(), 1);
    assert_eq!(
        writer.updates()[0].name,
        "Acme.Dallas.Packaging.Reserved.Line2.Filler.Motor.Speed"
    );
    assert_eq!(source.records().len(), 1);
    assert_eq!(source.records()[0].value, "1500");
    assert_known(&engine.state_snapshot(), metric_name, 1500);

    let batch = engine.run_cycle().await.unwrap();
    assert!(batch.is_empty(), "write must neither echo nor discover: {batch:?}");
}

#[tokio::test]
async fn test_writeback_unknown_hierarchical_name_is_refused() {
    let dir = temp_test_dir("engine-writeback-isa-new");
    let source = Arc::new(MockTagSource::new(vec![TagFixtures::hierarchical()]));
    let writer = Arc::new(MockTagWriter::linked(source.clone()));
    let engine = engine_with(&dir, source.clone(), writer.clone());
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    let report = engine
        .apply_outgoing(&[Metric::new(
            "Acme\\Dallas\\Packaging\\Line2\\Filler/_N1\\Motor\\Torque",
            3,
        )])
        .await;

    assert_eq!(report, WritebackReport { written: 0, failed: 0, skipped: 1 });
    assert!(writer.inserts().is_empty());
    assert!(engine.run_cycle().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_writeback_keeps_the_tag_type() {
    let dir = temp_test_dir("engine-writeback-type");
    let (engine, source, writer) = bootstrapped(&dir).await;

    let report = engine
        .apply_outgoing(&[Metric::new("Line1/_N1/Speed", 20i32)])
        .await;

    assert_eq!(report.written, 1);
    let update = &writer.updates()[0];
    assert_eq!(update.data_type, tagbridge_core::SourceDataType::Double);
    assert_eq!(update.value, "20");

    let stored = engine.state_snapshot().get("Line1/_N1/Speed").cloned().unwrap();
    assert_eq!(stored.data_type, MetricDataType::Double);
    assert_eq!(stored.value, MetricValue::Double(20.0));

    let speed = source.records().into_iter().find(|r| r.name == "Line1.Speed").unwrap();
    assert_eq!(speed.data_type, tagbridge_core::SourceDataType::Double);

    let batch = engine.run_cycle().await.unwrap();
    assert!(batch.changed.is_empty(), "written value echoed back: {batch:?}");
}

#[tokio::test]
async fn test_writeback_rejects_value_the_tag_cannot_hold() {
    let dir = temp_test_dir("engine-writeback-narrow");
    let (engine, source, writer) = bootstrapped(&dir).await;

    let report = engine
        .apply_outgoing(&[Metric::new("Line1/_N1/Count", 42.5)])
        .await;

    assert_eq!(report, WritebackReport { written: 0, failed: 0, skipped: 1 });
    assert!(writer.updates().is_empty());
    assert!(writer.inserts().is_empty());
    assert_eq!(source.records().len(), 4);
    assert_known(&engine.state_snapshot(), "Line1/_N1/Count", 420);
}

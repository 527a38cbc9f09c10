// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # State Persistence Integration Tests
//!
//! Known-metric state across engine restarts and on disk.

use std::path::Path;
use std::sync::Arc;

use tagbridge_core::lifecycle::LIFECYCLE_METRIC_NAMES;
use tagbridge_core::{Metric, StartupMode, StatePersistence, StateSnapshot, SyncEngine};
use tagbridge_tests::prelude::*;

fn state_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("knownMetrics.json")
}

fn engine(dir: &tempfile::TempDir, source: Arc<MockTagSource>) -> SyncEngine {
    init_test_logging();
    let writer = Arc::new(MockTagWriter::linked(source.clone()));
    SyncEngine::new(ConfigFixtures::engine_context(dir.path()), source, writer).unwrap()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_persisted_document_layout() {
    let dir = temp_test_dir("state-layout");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    engine(&dir, source).bootstrap(StartupMode::Baseline).await.unwrap();

    let doc = read_json(&state_file(&dir));
    assert!(doc["timestamp"].is_string());

    let known = doc["knownMetrics"].as_object().unwrap();
    assert_eq!(known.len(), 4 + LIFECYCLE_METRIC_NAMES.len());
    for name in LIFECYCLE_METRIC_NAMES {
        assert!(known.contains_key(name), "missing lifecycle metric {name}");
    }
    assert_eq!(known["Line1/_N1/Speed"]["name"], "Line1/_N1/Speed");
    assert_eq!(known["Line1/_N1/Speed"]["dataType"], "Double");
}

#[tokio::test]
async fn test_writeback_survives_restart() {
    let dir = temp_test_dir("state-restart");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));

    {
        let first = engine(&dir, source.clone());
        first.bootstrap(StartupMode::Baseline).await.unwrap();
        let report = first
            .apply_outgoing(&[Metric::new("Line1/_N1/Speed", 20.0)])
            .await;
        assert_eq!(report.written, 1);
        first.persist().await.unwrap();
    }

    let second = engine(&dir, source);
    let boot = second.bootstrap(StartupMode::Resume).await.unwrap();

    assert!(boot.pending.is_empty(), "nothing changed while offline: {:?}", boot.pending);
    assert_known(&second.state_snapshot(), "Line1/_N1/Speed", 20.0);
}

#[tokio::test]
async fn test_resume_without_state_offers_everything_as_new() {
    let dir = temp_test_dir("state-missing");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let engine = engine(&dir, source);

    let boot = engine.bootstrap(StartupMode::Resume).await.unwrap();

    assert!(boot.pending.changed.is_empty());
    assert_eq!(boot.pending.discovered.len(), 4);
    assert_eq!(boot.birth.len(), LIFECYCLE_METRIC_NAMES.len());
    assert!(!state_file(&dir).exists());
}

#[tokio::test]
async fn test_resume_from_corrupt_state() {
    let dir = temp_test_dir("state-corrupt");
    std::fs::write(state_file(&dir), "{\"knownMetrics\": [truncated").unwrap();
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let engine = engine(&dir, source);

    let boot = engine.bootstrap(StartupMode::Resume).await.unwrap();

    assert_eq!(boot.pending.discovered.len(), 4);
    engine.accept_discovered(boot.pending.discovered_metrics());
    engine.persist().await.unwrap();

    let reloaded = StatePersistence::new(state_file(&dir)).load();
    assert_eq!(reloaded.len(), 4 + LIFECYCLE_METRIC_NAMES.len());
    assert_known(&reloaded, "Line1/_N1/Product", "SKU-100");
}

#[tokio::test]
async fn test_baseline_replaces_stale_state() {
    let dir = temp_test_dir("state-stale");
    let persistence = StatePersistence::new(state_file(&dir));
    let mut stale = StateSnapshot::from_metrics([Metric::new("Old/_N1/Gone", 1i32)]);
    persistence.save(&mut stale).unwrap();

    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let engine = engine(&dir, source);
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    assert!(!engine.state().contains("Old/_N1/Gone"));
    assert!(!persistence.load().contains("Old/_N1/Gone"));
}

#[tokio::test]
async fn test_persist_leaves_no_temporary_file() {
    let dir = temp_test_dir("state-tmp");
    let source = Arc::new(MockTagSource::new(TagFixtures::packaging_line()));
    let engine = engine(&dir, source.clone());
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    source.set_value("Line1.Count", "500");
    engine.run_cycle().await.unwrap();
    engine.persist().await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["knownMetrics.json".to_string()]);
    assert_known(&StatePersistence::new(state_file(&dir)).load(), "Line1/_N1/Count", 500);
}

#[tokio::test]
async fn test_duplicate_source_names_keep_first() {
    let dir = temp_test_dir("state-duplicates");
    let mut records = TagFixtures::packaging_line();
    let mut duplicate = records[0].clone();
    duplicate.id = 50;
    duplicate.value = "99.9".into();
    records.push(duplicate);

    let source = Arc::new(MockTagSource::new(records));
    let engine = engine(&dir, source);
    engine.bootstrap(StartupMode::Baseline).await.unwrap();

    assert_known(&engine.state_snapshot(), "Line1/_N1/Speed", 12.5);
    assert_eq!(engine.state().len(), 4 + LIFECYCLE_METRIC_NAMES.len());
}

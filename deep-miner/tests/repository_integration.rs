//! File-backed record store and JSON Lines sink, end to end.

use std::sync::Arc;

use deep_miner::analyzers::{CrossTabulation, VariableCensusEntry};
use deep_miner::prelude::*;
use deep_miner::repository::jsonl::SinkFile;
use deep_miner::repository::SinkRow;
use serde_json::json;

/// Writes `n` UFO rows split across raw and exploratory payloads, plus a
/// few rows of another domain.
fn write_export(path: &std::path::Path, n: usize) {
    let shapes = ["disk", "orb", "triangle"];
    let mut lines = Vec::new();
    for i in 0..n {
        let shape = shapes[i % shapes.len()];
        lines.push(
            json!({
                "id": i,
                "investigation_type": "ufo",
                "created_at": format!("{}-05-01T00:00:00Z", 2019 + i % 3),
                "raw_data": {"shape": shape, "effects": {"em_interference": false}},
                "exploratory_data": {"effects": {"em_interference": shape == "disk"}},
            })
            .to_string(),
        );
    }
    for i in 0..5 {
        lines.push(
            json!({
                "id": format!("nde-{i}"),
                "domain": "nde",
                "created_at": "2020-01-01T00:00:00Z",
                "raw_data": {"tunnel": true},
            })
            .to_string(),
        );
    }
    std::fs::write(path, lines.join("\n")).unwrap();
}

#[tokio::test]
async fn test_file_store_to_jsonl_sink() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("records.jsonl");
    write_export(&export, 90);

    let sink = Arc::new(JsonLinesResultSink::create(dir.path().join("out")).await.unwrap());
    let miner = DeepMiner::new(
        Arc::new(JsonFileRecordStore::new(&export)),
        sink.clone(),
        MinerConfig::for_domain(Domain::Ufo),
    );
    let report = miner.run().await.unwrap();
    assert_eq!(report.session.stats.records_analyzed, 90);
    assert_eq!(report.session.stats.variables_found, 2);

    let sessions: Vec<DeepMinerSession> = sink.read_rows(SinkFile::Sessions).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.last().unwrap(), &report.session);

    let census: Vec<SinkRow<VariableCensusEntry>> = sink.read_rows(SinkFile::Census).await.unwrap();
    let paths: Vec<&str> = census.iter().map(|r| r.row.path.as_str()).collect();
    assert_eq!(paths, vec!["effects.em_interference", "shape"]);

    // exploratory payload overrides the raw flag
    let em = &census[0].row;
    assert_eq!(em.value_distribution.as_ref().unwrap()["true"], 30);

    let cross_tabs: Vec<SinkRow<CrossTabulation>> =
        sink.read_rows(SinkFile::CrossTabs).await.unwrap();
    assert_eq!(cross_tabs.len(), 1);
    assert_eq!(cross_tabs[0].session_id, report.session.id);
    assert!(cross_tabs[0].row.is_significant);

    let temporal_rows: Vec<serde_json::Value> = sink.read_rows(SinkFile::Temporal).await.unwrap();
    assert_eq!(temporal_rows.len(), report.session.stats.temporal_analyses);
    if let Some(row) = temporal_rows.first() {
        assert_eq!(row["date_field"], "created_at");
        assert_eq!(row["domain"], "ufo");
    }

    let metadata = sink.metadata().await.unwrap();
    assert_eq!(metadata.backend_type.as_deref(), Some("jsonl"));
    assert_eq!(metadata.sessions, 1);
    let persisted: usize = report.phases.iter().map(|p| p.persisted).sum();
    assert_eq!(metadata.rows_written, persisted);
}

#[tokio::test]
async fn test_other_domains_are_filtered_out() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("records.jsonl");
    write_export(&export, 12);

    let store = JsonFileRecordStore::new(&export);
    let nde = store.load(Domain::Nde, 100).await.unwrap();
    assert_eq!(nde.len(), 5);
    assert!(nde.iter().all(|r| r.domain == Domain::Nde));
    assert_eq!(store.load(Domain::Ufo, 4).await.unwrap().len(), 4);
    assert!(store.load(Domain::Ganzfeld, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_export_fails_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("records.jsonl");
    std::fs::write(&export, "{\"id\": 1, \"investigation_type\": \"ufo\"").unwrap();

    let sink = Arc::new(JsonLinesResultSink::create(dir.path()).await.unwrap());
    let miner = DeepMiner::new(
        Arc::new(JsonFileRecordStore::new(&export)),
        sink.clone(),
        MinerConfig::default(),
    );
    let err = miner.run().await.unwrap_err();
    assert!(matches!(err, MinerError::RecordStore { .. }));

    let sessions: Vec<DeepMinerSession> = sink.read_rows(SinkFile::Sessions).await.unwrap();
    assert_eq!(sessions.last().unwrap().status, SessionStatus::Failed);
}

//! End-to-end mining sessions over in-memory backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use deep_miner::prelude::*;

#[tokio::test]
async fn test_full_session_persists_every_finding() {
    let (miner, sink) = in_memory_miner(ufo_sightings(400), MinerConfig::default());
    let report = miner.run().await.unwrap();
    let stats = &report.session.stats;

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert!(report.session.completed_at.is_some());
    assert!(!report.session.truncated);
    assert_eq!(stats.records_analyzed, 400);
    assert_eq!(stats.variables_found, 5);
    assert_eq!(stats.cross_tabs_computed, 3);
    assert!(stats.significant_associations >= 1);
    assert_eq!(stats.temporal_analyses, 2);
    assert_eq!(stats.write_failures, 0);
    assert_eq!(report.findings.date_field.as_deref(), Some("sighting_date"));

    assert_eq!(sink.census_entries().await.len(), 5);
    assert_eq!(sink.cross_tabs().await.len(), 3);
    assert_eq!(sink.subgroup_analyses().await.len(), stats.subgroups_analyzed);
    assert_eq!(sink.temporal_analyses().await.len(), 2);
    assert!(sink
        .cross_tabs()
        .await
        .iter()
        .all(|row| row.session_id == report.session.id && row.domain == Domain::Ufo));

    let history = sink.session_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, SessionStatus::Running);
    assert_eq!(history[1], report.session);

    for phase in Phase::ALL {
        assert!(report.phase(phase).is_some());
    }
    assert!(report.phase_errors.is_empty());
}

#[tokio::test]
async fn test_store_failure_fails_the_session() {
    let sink = InMemoryResultSink::new();
    let miner = DeepMiner::new(
        Arc::new(UnreachableStore),
        Arc::new(sink.clone()),
        MinerConfig::default(),
    );

    let err = miner.run().await.unwrap_err();
    assert!(matches!(err, MinerError::RecordStore { .. }));

    let sessions = sink.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Failed);
    assert!(sessions[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("connection refused"));
    assert!(sink.census_entries().await.is_empty());
}

#[tokio::test]
async fn test_session_create_failure_aborts_before_loading() {
    let sink = FailingSink::new([SinkOp::CreateSession]);
    let miner = DeepMiner::new(
        Arc::new(InMemoryRecordStore::with_records(ufo_sightings(50))),
        Arc::new(sink.clone()),
        MinerConfig::default(),
    );

    let err = miner.run().await.unwrap_err();
    assert!(matches!(err, MinerError::Sink { .. }));
    assert!(sink.inner.sessions().await.is_empty());
    assert!(sink.inner.census_entries().await.is_empty());
}

#[tokio::test]
async fn test_row_write_failures_are_counted_not_fatal() {
    let sink = FailingSink::new([SinkOp::CrossTab]);
    let miner = DeepMiner::new(
        Arc::new(InMemoryRecordStore::with_records(ufo_sightings(200))),
        Arc::new(sink.clone()),
        MinerConfig::default(),
    );

    let report = miner.run().await.unwrap();
    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.session.stats.cross_tabs_computed, 3);
    assert_eq!(report.session.stats.write_failures, 3);
    assert_eq!(report.findings.cross_tabs.len(), 3);
    assert!(sink.inner.cross_tabs().await.is_empty());
    assert_eq!(sink.inner.census_entries().await.len(), 5);

    let phase = report.phase(Phase::CrossTabulation).unwrap();
    assert_eq!(phase.persisted, 0);
    assert_eq!(phase.write_failures, 3);
    assert!(report
        .session
        .summary
        .as_deref()
        .unwrap()
        .contains("3 rows failed to persist."));
}

#[tokio::test]
async fn test_session_completion_write_failure_is_returned() {
    let sink = FailingSink::new([SinkOp::UpdateSession]);
    let miner = DeepMiner::new(
        Arc::new(InMemoryRecordStore::with_records(ufo_sightings(50))),
        Arc::new(sink.clone()),
        MinerConfig::default(),
    );

    let err = miner.run().await.unwrap_err();
    assert!(matches!(err, MinerError::Sink { .. }));
    let sessions = sink.inner.sessions().await;
    assert_eq!(sessions[0].status, SessionStatus::Running);
}

#[tokio::test]
async fn test_cancellation_between_phases() {
    let (miner, sink) = in_memory_miner(ufo_sightings(200), MinerConfig::default());
    let flag = miner.cancellation_flag();
    let miner = miner.on_progress(move |phase, _| {
        if phase == Phase::Census {
            flag.cancel();
        }
    });

    let err = miner.run().await.unwrap_err();
    assert!(matches!(err, MinerError::Cancelled));

    let sessions = sink.sessions().await;
    assert_eq!(sessions[0].status, SessionStatus::Failed);
    assert_eq!(sessions[0].error_message.as_deref(), Some("Session cancelled"));
    assert_eq!(sink.census_entries().await.len(), 5);
    assert!(sink.cross_tabs().await.is_empty());
}

#[tokio::test]
async fn test_external_cancellation_flag() {
    let flag = CancellationFlag::new();
    let (miner, sink) = in_memory_miner(ufo_sightings(100), MinerConfig::default());
    let miner = miner.with_cancellation(flag.clone());
    flag.cancel();

    assert!(matches!(miner.run().await, Err(MinerError::Cancelled)));
    assert!(sink.census_entries().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_time_budget_truncates() {
    let config = MinerConfig::default().with_time_budget(Duration::from_nanos(1));
    let (miner, sink) = in_memory_miner(ufo_sightings(200), config);

    let report = miner.run().await.unwrap();
    assert_eq!(report.session.status, SessionStatus::Completed);
    assert!(report.session.truncated);
    assert_eq!(report.session.stats.variables_found, 5);
    assert_eq!(report.session.stats.cross_tabs_computed, 0);
    assert!(report.phase(Phase::CrossTabulation).unwrap().stopped_early);
    assert!(sink.cross_tabs().await.is_empty());
    assert!(report
        .session
        .summary
        .as_deref()
        .unwrap()
        .contains("Stopped early: time budget exhausted."));
}

#[tokio::test]
async fn test_parallel_workers_match_sequential_results() {
    let records = ufo_sightings(300);
    let (sequential, _) =
        in_memory_miner(records.clone(), MinerConfig::default().with_worker_threads(1));
    let (parallel, _) = in_memory_miner(records, MinerConfig::default().with_worker_threads(4));

    let a = sequential.run().await.unwrap();
    let b = parallel.run().await.unwrap();
    assert_eq!(a.findings.cross_tabs, b.findings.cross_tabs);
    assert_eq!(a.findings.subgroups, b.findings.subgroups);
    assert_eq!(a.findings.temporal, b.findings.temporal);
    assert_eq!(a.session.stats, b.session.stats);
}

#[tokio::test]
async fn test_empty_domain_completes_with_nothing_found() {
    let (miner, sink) = in_memory_miner(scenario_a(), MinerConfig::for_domain(Domain::Nde));
    let report = miner.run().await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.session.stats, Default::default());
    assert_eq!(report.findings.date_field, None);
    assert!(report
        .session
        .summary
        .as_deref()
        .unwrap()
        .starts_with("Analyzed 0 near-death experience records: 0 variables"));
    assert_eq!(sink.sessions().await.len(), 1);
}

#[tokio::test]
async fn test_report_renders_through_formatters() {
    let (miner, _) = in_memory_miner(scenario_a(), MinerConfig::default());
    let report = miner.run().await.unwrap();
    assert_eq!(report.significant_cross_tabs().len(), 1);

    let markdown = MarkdownFormatter::new().format(&report).unwrap();
    assert!(markdown.contains("## Deep Miner Report: UFO/UAP"));
    assert!(markdown.contains("| a × b | 8.30 | 1 |"));

    let human = HumanFormatter::with_config(FormatterConfig::minimal()).format(&report).unwrap();
    assert!(human.contains("a × b: χ²(1) = 8.30"));
    assert!(!human.contains("\x1b["));

    let json: serde_json::Value =
        serde_json::from_str(&JsonFormatter::new().format(&report).unwrap()).unwrap();
    assert_eq!(json["session"]["stats"]["cross_tabs_computed"], 1);
}

fn row_keys<T: serde::Serialize>(row: &T) -> Vec<String> {
    serde_json::to_value(row)
        .unwrap()
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect()
}

#[tokio::test]
async fn test_persisted_rows_use_data_model_field_names() {
    let config = MinerConfig::default().with_min_sample_for_subgroup(10);
    let (miner, sink) = in_memory_miner(ufo_sightings(400), config);
    miner.run().await.unwrap();

    let cross_tabs = sink.cross_tabs().await;
    let keys = row_keys(&cross_tabs[0]);
    for key in [
        "session_id",
        "domain",
        "variable_a",
        "variable_a_path",
        "variable_b",
        "variable_b_path",
        "contingency_table",
        "chi_square",
        "degrees_of_freedom",
        "p_value",
        "cramers_v",
        "significant",
        "effect_size_category",
        "interpretation",
        "total_n",
        "valid_n",
    ] {
        assert!(keys.contains(&key.to_string()), "cross-tab row lacks {key}");
    }
    for stale in ["path_a", "table", "is_significant", "effect_size"] {
        assert!(!keys.contains(&stale.to_string()));
    }

    let census = sink.census_entries().await;
    let witnesses = census.iter().find(|row| row.row.path == "witnesses").unwrap();
    let keys = row_keys(witnesses);
    for key in [
        "variable_name",
        "variable_path",
        "variable_type",
        "total_records",
        "non_null_count",
        "null_count",
        "missing_rate",
        "continuous",
    ] {
        assert!(keys.contains(&key.to_string()), "census row lacks {key}");
    }
    let sighting = census
        .iter()
        .find(|row| row.row.path == "sighting_date")
        .unwrap();
    let keys = row_keys(sighting);
    assert!(keys.contains(&"earliest_date".to_string()));
    assert!(keys.contains(&"latest_date".to_string()));

    let subgroups = sink.subgroup_analyses().await;
    let group = serde_json::to_value(&subgroups[0].row.subgroups[0]).unwrap();
    assert!(group.get("name").is_some());
    assert!(group.get("group").is_none());

    let temporal = sink.temporal_analyses().await;
    let keys = row_keys(&temporal[0]);
    assert!(keys.contains(&"variable_name".to_string()));
    assert!(keys.contains(&"variable_path".to_string()));
}

//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use deep_miner::analyzers::{
    CrossTabulation, SubgroupAnalysis, TemporalStabilityAnalysis, VariableCensusEntry,
};
use deep_miner::prelude::*;
use deep_miner::repository::SinkRow;
use serde_json::{json, Value};

pub fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// One record of `domain` per payload, all created on 2024-01-01.
pub fn records_from(domain: Domain, payloads: Vec<Value>) -> Vec<Record> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(i, data)| Record::new(format!("rec-{i:04}"), domain, timestamp(2024, 1, 1), data))
        .collect()
}

fn repeat(payload: Value, times: usize) -> impl Iterator<Item = Value> {
    std::iter::repeat(payload).take(times)
}

/// Two categorical fields skewed toward `y -> q` (n = 70).
pub fn scenario_a() -> Vec<Record> {
    let payloads = repeat(json!({"a": "x", "b": "p"}), 20)
        .chain(repeat(json!({"a": "x", "b": "q"}), 20))
        .chain(repeat(json!({"a": "y", "b": "p"}), 5))
        .chain(repeat(json!({"a": "y", "b": "q"}), 25))
        .collect();
    records_from(Domain::Ufo, payloads)
}

/// A boolean with rate 0.5 in 2020, 2021 and 2022.
pub fn scenario_b() -> Vec<Record> {
    let mut records = Vec::new();
    for (year, n) in [(2020, 16), (2021, 12), (2022, 18)] {
        for i in 0..n {
            records.push(Record::new(
                format!("b-{year}-{i}"),
                Domain::Ganzfeld,
                timestamp(year, 1 + (i % 12) as u32, 1),
                json!({"hit": i % 2 == 0}),
            ));
        }
    }
    records
}

/// 10 records in group A (90% true) and 15 in group B (about 10% true).
pub fn scenario_c() -> Vec<Record> {
    let group_a = (0..10).map(|i| json!({"group": "A", "target": i != 0}));
    let group_b = (0..15).map(|i| json!({"group": "B", "target": i < 2}));
    records_from(Domain::Nde, group_a.chain(group_b).collect())
}

/// Mixed-case boolean strings with one unrecognized value.
pub fn scenario_d() -> Vec<Record> {
    let payloads = ["yes", "no", "YES", "unknown"]
        .iter()
        .map(|v| json!({"contact": v}))
        .collect();
    records_from(Domain::CrisisApparition, payloads)
}

/// Scenario D's values cycled over `n` records, with a `relation` field
/// alternating in blocks of four.
pub fn scenario_d_cycled(n: usize) -> Vec<Record> {
    let contact = ["yes", "no", "YES", "unknown"];
    let payloads = (0..n)
        .map(|i| {
            let relation = if (i / 4) % 2 == 0 { "family" } else { "stranger" };
            json!({"contact": contact[i % 4], "relation": relation})
        })
        .collect();
    records_from(Domain::CrisisApparition, payloads)
}

/// A realistic UFO collection: nested payloads, a categorical shape, two
/// booleans linked to it, a continuous witness count, free-text notes and a
/// sighting date spread over four years.
pub fn ufo_sightings(n: usize) -> Vec<Record> {
    let shapes = ["disk", "orb", "triangle", "cigar"];
    (0..n)
        .map(|i| {
            let shape = shapes[i % shapes.len()];
            let year = 2019 + (i % 4) as i32;
            let data = json!({
                "shape": shape,
                "sighting_date": format!("{year}-{:02}-15", 1 + i % 12),
                "witnesses": (1 + i % 6) as u64,
                "notes": format!("observer report {i}"),
                "effects": {
                    "em_interference": shape == "disk" || (shape == "cigar" && i % 3 == 0),
                    "physiological": if i % 5 == 0 { "yes" } else { "no" },
                },
            });
            Record::new(format!("ufo-{i:05}"), Domain::Ufo, timestamp(2024, 1, 1), data)
        })
        .collect()
}

pub fn in_memory_miner(
    records: Vec<Record>,
    config: MinerConfig,
) -> (DeepMiner, InMemoryResultSink) {
    let sink = InMemoryResultSink::new();
    let miner = DeepMiner::new(
        Arc::new(InMemoryRecordStore::with_records(records)),
        Arc::new(sink.clone()),
        config,
    );
    (miner, sink)
}

/// Sink operations a [`FailingSink`] can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkOp {
    CreateSession,
    UpdateSession,
    Census,
    CrossTab,
    Subgroup,
    Temporal,
}

/// Wraps an in-memory sink and fails the selected operations.
#[derive(Clone)]
pub struct FailingSink {
    pub inner: InMemoryResultSink,
    failing: HashSet<SinkOp>,
}

impl FailingSink {
    pub fn new(failing: impl IntoIterator<Item = SinkOp>) -> Self {
        Self {
            inner: InMemoryResultSink::new(),
            failing: failing.into_iter().collect(),
        }
    }

    fn check(&self, op: SinkOp) -> Result<()> {
        if self.failing.contains(&op) {
            Err(MinerError::sink("failing", format!("{op:?}"), "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResultSink for FailingSink {
    async fn create_session(&self, session: &DeepMinerSession) -> Result<()> {
        self.check(SinkOp::CreateSession)?;
        self.inner.create_session(session).await
    }

    async fn update_session(&self, session: &DeepMinerSession) -> Result<()> {
        self.check(SinkOp::UpdateSession)?;
        self.inner.update_session(session).await
    }

    async fn save_census_entry(&self, row: SinkRow<VariableCensusEntry>) -> Result<()> {
        self.check(SinkOp::Census)?;
        self.inner.save_census_entry(row).await
    }

    async fn save_cross_tab(&self, row: SinkRow<CrossTabulation>) -> Result<()> {
        self.check(SinkOp::CrossTab)?;
        self.inner.save_cross_tab(row).await
    }

    async fn save_subgroup_analysis(&self, row: SinkRow<SubgroupAnalysis>) -> Result<()> {
        self.check(SinkOp::Subgroup)?;
        self.inner.save_subgroup_analysis(row).await
    }

    async fn save_temporal_analysis(&self, row: SinkRow<TemporalStabilityAnalysis>) -> Result<()> {
        self.check(SinkOp::Temporal)?;
        self.inner.save_temporal_analysis(row).await
    }
}

/// A record store that always fails.
pub struct UnreachableStore;

#[async_trait]
impl RecordStore for UnreachableStore {
    async fn load(&self, _domain: Domain, _limit: usize) -> Result<Vec<Record>> {
        Err(MinerError::record_store("unreachable", "connection refused"))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

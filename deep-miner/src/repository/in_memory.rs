//! In-memory record store and result sink for tests and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::instrument;

use super::{RecordStore, ResultSink, SinkMetadata, SinkRow};
use crate::analyzers::{
    CrossTabulation, SubgroupAnalysis, TemporalStabilityAnalysis, VariableCensusEntry,
};
use crate::error::{MinerError, Result};
use crate::record::{Domain, Record};
use crate::session::DeepMinerSession;

/// Records held in memory, returned in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn insert(&self, record: Record) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self), fields(store = "in_memory"))]
    async fn load(&self, domain: Domain, limit: usize) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.domain == domain)
            .take(limit)
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

#[derive(Default)]
struct SinkState {
    sessions: HashMap<String, DeepMinerSession>,
    /// Every session write, in order
    history: Vec<DeepMinerSession>,
    census: Vec<SinkRow<VariableCensusEntry>>,
    cross_tabs: Vec<SinkRow<CrossTabulation>>,
    subgroups: Vec<SinkRow<SubgroupAnalysis>>,
    temporal: Vec<SinkRow<TemporalStabilityAnalysis>>,
    last_modified: Option<DateTime<Utc>>,
}

impl SinkState {
    fn rows_written(&self) -> usize {
        self.census.len() + self.cross_tabs.len() + self.subgroups.len() + self.temporal.len()
    }

    fn touch(&mut self) {
        self.last_modified = Some(Utc::now());
    }
}

/// Result sink that keeps every row in memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// engine and inspect another.
#[derive(Clone, Default)]
pub struct InMemoryResultSink {
    state: Arc<RwLock<SinkState>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot of a session.
    pub async fn session(&self, id: &str) -> Option<DeepMinerSession> {
        self.state.read().await.sessions.get(id).cloned()
    }

    pub async fn sessions(&self) -> Vec<DeepMinerSession> {
        self.state.read().await.sessions.values().cloned().collect()
    }

    /// Every session write in order, including intermediate states.
    pub async fn session_history(&self) -> Vec<DeepMinerSession> {
        self.state.read().await.history.clone()
    }

    pub async fn census_entries(&self) -> Vec<SinkRow<VariableCensusEntry>> {
        self.state.read().await.census.clone()
    }

    pub async fn cross_tabs(&self) -> Vec<SinkRow<CrossTabulation>> {
        self.state.read().await.cross_tabs.clone()
    }

    pub async fn subgroup_analyses(&self) -> Vec<SinkRow<SubgroupAnalysis>> {
        self.state.read().await.subgroups.clone()
    }

    pub async fn temporal_analyses(&self) -> Vec<SinkRow<TemporalStabilityAnalysis>> {
        self.state.read().await.temporal.clone()
    }

    /// Clears all stored rows and sessions.
    pub async fn clear(&self) {
        *self.state.write().await = SinkState::default();
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    #[instrument(skip(self, session), fields(session_id = %session.id, sink = "in_memory"))]
    async fn create_session(&self, session: &DeepMinerSession) -> Result<()> {
        let mut state = self.state.write().await;
        if state.sessions.contains_key(&session.id) {
            return Err(MinerError::sink(
                "in_memory",
                "create_session",
                format!("session {} already exists", session.id),
            ));
        }
        state.sessions.insert(session.id.clone(), session.clone());
        state.history.push(session.clone());
        state.touch();
        Ok(())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, sink = "in_memory"))]
    async fn update_session(&self, session: &DeepMinerSession) -> Result<()> {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(&session.id) {
            Some(existing) => *existing = session.clone(),
            None => {
                return Err(MinerError::sink(
                    "in_memory",
                    "update_session",
                    format!("unknown session {}", session.id),
                ))
            }
        }
        state.history.push(session.clone());
        state.touch();
        Ok(())
    }

    async fn save_census_entry(&self, row: SinkRow<VariableCensusEntry>) -> Result<()> {
        let mut state = self.state.write().await;
        state.census.push(row);
        state.touch();
        Ok(())
    }

    async fn save_cross_tab(&self, row: SinkRow<CrossTabulation>) -> Result<()> {
        let mut state = self.state.write().await;
        state.cross_tabs.push(row);
        state.touch();
        Ok(())
    }

    async fn save_subgroup_analysis(&self, row: SinkRow<SubgroupAnalysis>) -> Result<()> {
        let mut state = self.state.write().await;
        state.subgroups.push(row);
        state.touch();
        Ok(())
    }

    async fn save_temporal_analysis(&self, row: SinkRow<TemporalStabilityAnalysis>) -> Result<()> {
        let mut state = self.state.write().await;
        state.temporal.push(row);
        state.touch();
        Ok(())
    }

    async fn metadata(&self) -> Result<SinkMetadata> {
        let state = self.state.read().await;
        Ok(SinkMetadata {
            rows_written: state.rows_written(),
            sessions: state.sessions.len(),
            last_modified: state.last_modified,
            ..SinkMetadata::new("in_memory")
        })
    }
}

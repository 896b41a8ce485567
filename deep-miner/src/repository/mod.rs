//! Record sources and result sinks.
//!
//! The engine reads records through a [`RecordStore`] and writes every
//! session row and finding through a [`ResultSink`]. Both are async traits
//! so that backends can do I/O without blocking the runtime.
//!
//! Bundled backends:
//!
//! - [`InMemoryRecordStore`] / [`InMemoryResultSink`] for tests and embedding
//! - [`JsonFileRecordStore`] reads a JSON array or JSON Lines export
//! - [`JsonLinesResultSink`] appends rows to one `.jsonl` file per kind

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::{
    CrossTabulation, SubgroupAnalysis, TemporalStabilityAnalysis, VariableCensusEntry,
};
use crate::error::Result;
use crate::record::{Domain, Record};
use crate::session::DeepMinerSession;

pub mod file;
pub mod in_memory;
pub mod jsonl;

pub use file::JsonFileRecordStore;
pub use in_memory::{InMemoryRecordStore, InMemoryResultSink};
pub use jsonl::JsonLinesResultSink;

/// Source of investigation records.
///
/// # Example
///
/// ```rust,ignore
/// use deep_miner::repository::{InMemoryRecordStore, RecordStore};
///
/// let store = InMemoryRecordStore::with_records(records);
/// let ufo = store.load(Domain::Ufo, 50_000).await?;
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads up to `limit` records of `domain`, each with its raw and
    /// exploratory payloads already merged.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read. An empty result is
    /// not an error.
    async fn load(&self, domain: Domain, limit: usize) -> Result<Vec<Record>>;

    /// Short backend name used in logs and errors.
    fn backend_name(&self) -> &'static str;
}

/// A result row tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRow<T> {
    pub session_id: String,
    pub domain: Domain,
    #[serde(flatten)]
    pub row: T,
}

impl<T> SinkRow<T> {
    pub fn new(session_id: impl Into<String>, domain: Domain, row: T) -> Self {
        Self {
            session_id: session_id.into(),
            domain,
            row,
        }
    }
}

/// Destination for session rows and findings.
///
/// Session writes are fatal to a session when they fail. Finding writes
/// are not: the engine logs the failure, counts it, and moves on.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Inserts a new session row.
    async fn create_session(&self, session: &DeepMinerSession) -> Result<()>;

    /// Replaces an existing session row.
    async fn update_session(&self, session: &DeepMinerSession) -> Result<()>;

    async fn save_census_entry(&self, row: SinkRow<VariableCensusEntry>) -> Result<()>;

    async fn save_cross_tab(&self, row: SinkRow<CrossTabulation>) -> Result<()>;

    async fn save_subgroup_analysis(&self, row: SinkRow<SubgroupAnalysis>) -> Result<()>;

    async fn save_temporal_analysis(&self, row: SinkRow<TemporalStabilityAnalysis>) -> Result<()>;

    /// Returns metadata about the sink.
    async fn metadata(&self) -> Result<SinkMetadata> {
        Ok(SinkMetadata::default())
    }
}

/// Metadata about a result sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkMetadata {
    /// The type of sink backend (e.g. "in_memory", "jsonl").
    pub backend_type: Option<String>,
    /// Finding rows written so far.
    pub rows_written: usize,
    /// Distinct sessions recorded.
    pub sessions: usize,
    pub last_modified: Option<DateTime<Utc>>,
}

impl SinkMetadata {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Default::default()
        }
    }
}

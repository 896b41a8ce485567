//! Result sink that appends JSON Lines files to a directory.
//!
//! One file per row kind. Session writes append a full snapshot each time,
//! so the last line for an id is its current state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;

use super::{ResultSink, SinkMetadata, SinkRow};
use crate::analyzers::{
    CrossTabulation, SubgroupAnalysis, TemporalStabilityAnalysis, VariableCensusEntry,
};
use crate::error::{MinerError, Result};
use crate::session::DeepMinerSession;

const BACKEND: &str = "jsonl";

/// Files written by [`JsonLinesResultSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkFile {
    Sessions,
    Census,
    CrossTabs,
    Subgroups,
    Temporal,
}

impl SinkFile {
    pub fn file_name(&self) -> &'static str {
        match self {
            SinkFile::Sessions => "sessions.jsonl",
            SinkFile::Census => "census.jsonl",
            SinkFile::CrossTabs => "cross_tabs.jsonl",
            SinkFile::Subgroups => "subgroups.jsonl",
            SinkFile::Temporal => "temporal.jsonl",
        }
    }
}

/// Appends every row as one JSON line.
pub struct JsonLinesResultSink {
    dir: PathBuf,
    // known session ids; the lock also serializes appends
    known_sessions: Mutex<HashSet<String>>,
    rows_written: AtomicUsize,
}

impl JsonLinesResultSink {
    /// Creates the output directory if needed.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            MinerError::sink(
                BACKEND,
                "create",
                format!("cannot create {}: {e}", dir.display()),
            )
        })?;
        Ok(Self {
            dir,
            known_sessions: Mutex::new(HashSet::new()),
            rows_written: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file: SinkFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    /// Reads back every row of one file.
    pub async fn read_rows<T: DeserializeOwned>(&self, file: SinkFile) -> Result<Vec<T>> {
        let path = self.path_of(file);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(MinerError::from))
            .collect()
    }

    async fn append<T: Serialize + Sync>(
        &self,
        file: SinkFile,
        operation: &str,
        value: &T,
    ) -> Result<()> {
        let mut line = serde_json::to_string(value)
            .map_err(|e| MinerError::sink(BACKEND, operation, e.to_string()))?;
        line.push('\n');

        let _guard = self.known_sessions.lock().await;
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_of(file))
            .await
            .map_err(|e| MinerError::sink(BACKEND, operation, e.to_string()))?;
        handle
            .write_all(line.as_bytes())
            .await
            .map_err(|e| MinerError::sink(BACKEND, operation, e.to_string()))?;
        handle
            .flush()
            .await
            .map_err(|e| MinerError::sink(BACKEND, operation, e.to_string()))?;
        Ok(())
    }

    async fn append_row<T: Serialize + Sync>(
        &self,
        file: SinkFile,
        operation: &str,
        row: &T,
    ) -> Result<()> {
        self.append(file, operation, row).await?;
        self.rows_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonLinesResultSink {
    #[instrument(skip(self, session), fields(session_id = %session.id, sink = BACKEND))]
    async fn create_session(&self, session: &DeepMinerSession) -> Result<()> {
        self.append(SinkFile::Sessions, "create_session", session)
            .await?;
        self.known_sessions.lock().await.insert(session.id.clone());
        Ok(())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, sink = BACKEND))]
    async fn update_session(&self, session: &DeepMinerSession) -> Result<()> {
        if !self.known_sessions.lock().await.contains(&session.id) {
            return Err(MinerError::sink(
                BACKEND,
                "update_session",
                format!("unknown session {}", session.id),
            ));
        }
        self.append(SinkFile::Sessions, "update_session", session)
            .await
    }

    async fn save_census_entry(&self, row: SinkRow<VariableCensusEntry>) -> Result<()> {
        self.append_row(SinkFile::Census, "save_census_entry", &row)
            .await
    }

    async fn save_cross_tab(&self, row: SinkRow<CrossTabulation>) -> Result<()> {
        self.append_row(SinkFile::CrossTabs, "save_cross_tab", &row)
            .await
    }

    async fn save_subgroup_analysis(&self, row: SinkRow<SubgroupAnalysis>) -> Result<()> {
        self.append_row(SinkFile::Subgroups, "save_subgroup_analysis", &row)
            .await
    }

    async fn save_temporal_analysis(&self, row: SinkRow<TemporalStabilityAnalysis>) -> Result<()> {
        self.append_row(SinkFile::Temporal, "save_temporal_analysis", &row)
            .await
    }

    async fn metadata(&self) -> Result<SinkMetadata> {
        let sessions = self.known_sessions.lock().await.len();
        let mut metadata = SinkMetadata::new(BACKEND);
        metadata.rows_written = self.rows_written.load(Ordering::Relaxed);
        metadata.sessions = sessions;
        metadata.last_modified = tokio::fs::metadata(self.path_of(SinkFile::Sessions))
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::<chrono::Utc>::from);
        Ok(metadata)
    }
}

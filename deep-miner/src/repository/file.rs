//! Record store backed by a JSON export on disk.
//!
//! The file holds either a JSON array of records or one record per line
//! (JSON Lines). Each record looks like:
//!
//! ```json
//! {"id": "r-1", "investigation_type": "ufo", "created_at": "2024-01-01T00:00:00Z",
//!  "raw_data": {"shape": "disk"}, "exploratory_data": {"effects": {"em_interference": true}}}
//! ```
//!
//! `domain` is accepted as an alias of `investigation_type`. Rows of other
//! domains, including names this crate does not know, are skipped. The
//! payload is `data` (if any), overlaid by `raw_data`, overlaid by
//! `exploratory_data`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::RecordStore;
use crate::error::{MinerError, Result};
use crate::record::{merge_documents, Domain, Record};

const BACKEND: &str = "json_file";

#[derive(Deserialize)]
struct StoredRecord {
    id: Value,
    #[serde(alias = "domain")]
    investigation_type: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    raw_data: Value,
    #[serde(default)]
    exploratory_data: Value,
}

impl StoredRecord {
    fn into_record(self, domain: Domain, position: usize) -> Result<Record> {
        let id = match self.id {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(MinerError::record_store(
                    BACKEND,
                    format!("record {position} has no usable id"),
                ))
            }
        };
        let mut payload = Value::Object(Map::new());
        merge_documents(&mut payload, self.data);
        merge_documents(&mut payload, self.raw_data);
        merge_documents(&mut payload, self.exploratory_data);
        Ok(Record::new(id, domain, self.created_at, payload))
    }
}

/// Reads records from a JSON or JSON Lines file.
#[derive(Debug, Clone)]
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> Result<Vec<StoredRecord>> {
        let trimmed = contents.trim_start();
        if trimmed.starts_with('[') {
            return serde_json::from_str(trimmed).map_err(|e| {
                MinerError::record_store_with_source(
                    BACKEND,
                    format!("{} is not a valid record array", self.path.display()),
                    Box::new(e),
                )
            });
        }

        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str(line).map_err(|e| {
                    MinerError::record_store_with_source(
                        BACKEND,
                        format!("{}:{}: invalid record", self.path.display(), number + 1),
                        Box::new(e),
                    )
                })
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    #[instrument(skip(self), fields(store = BACKEND, path = %self.path.display()))]
    async fn load(&self, domain: Domain, limit: usize) -> Result<Vec<Record>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            MinerError::record_store_with_source(
                BACKEND,
                format!("cannot read {}", self.path.display()),
                Box::new(e),
            )
        })?;

        let stored = self.parse(&contents)?;
        let total = stored.len();
        let records = stored
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.investigation_type == domain.as_str())
            .take(limit)
            .map(|(position, r)| r.into_record(domain, position))
            .collect::<Result<Vec<_>>>()?;

        debug!(total, loaded = records.len(), "Loaded records from file");
        Ok(records)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

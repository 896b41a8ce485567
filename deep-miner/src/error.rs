//! Error types for the Deep Miner engine.
//!
//! Errors here are infrastructure or configuration failures. Sparse data is
//! never an error: analyzers report it through
//! [`InsufficientData`](crate::analyzers::InsufficientData) instead.

use thiserror::Error;

use crate::session::SessionStatus;

/// The main error type for the Deep Miner engine.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Invalid caps, thresholds or other configuration values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The record store could not supply records.
    #[error("Record store error ({store}): {message}")]
    RecordStore {
        /// Backend that failed (e.g. "in_memory", "json_file")
        store: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A result sink rejected a write.
    #[error("Result sink error ({sink}) during {operation}: {message}")]
    Sink {
        /// Backend that failed
        sink: String,
        /// Operation being performed (e.g. "save_cross_tab")
        operation: String,
        /// Detailed error message
        message: String,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A session state change that the state machine does not allow.
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The caller cancelled the session.
    #[error("Session cancelled")]
    Cancelled,

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, MinerError>`.
pub type Result<T> = std::result::Result<T, MinerError>;

impl MinerError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a record store error.
    pub fn record_store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordStore {
            store: store.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a record store error with an underlying cause.
    pub fn record_store_with_source(
        store: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::RecordStore {
            store: store.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a sink error.
    pub fn sink(
        sink: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Sink {
            sink: sink.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MinerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<MinerError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                MinerError::Internal(inner) => MinerError::Internal(format!("{msg}: {inner}")),
                MinerError::Io(inner) => MinerError::Io(std::io::Error::new(
                    inner.kind(),
                    format!("{msg}: {inner}"),
                )),
                other => MinerError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

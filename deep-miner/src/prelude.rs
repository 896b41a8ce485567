//! Prelude for commonly used types and traits in deep-miner.

pub use crate::analyzers::{
    CrossTabulation, Finding, InsufficientData, SubgroupAnalysis, TemporalStabilityAnalysis,
    VariableCensusEntry, VariableType,
};
pub use crate::config::{MinerConfig, TemporalPeriod};
pub use crate::error::{ErrorContext, MinerError, Result};
pub use crate::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter,
};
pub use crate::logging::LogConfig;
pub use crate::miner::DeepMiner;
pub use crate::record::{Domain, Record};
pub use crate::repository::{
    InMemoryRecordStore, InMemoryResultSink, JsonFileRecordStore, JsonLinesResultSink,
    RecordStore, ResultSink,
};
pub use crate::session::{
    CancellationFlag, DeepMinerSession, Phase, SessionReport, SessionStatus,
};

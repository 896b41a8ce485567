//! Analyzers that turn a record set into findings.
//!
//! ## Available Analyzers
//!
//! - **Type Inference Engine** (`inference`): boolean/numeric/date detection
//!   over raw JSON observations
//! - **Variable Extractor** (`extractor`): flattens payloads, types every
//!   path and aligns values by record index
//! - **Census** (`census`): per-variable missingness, distributions and
//!   descriptive statistics
//! - **Cross-Tabulation** (`cross_tab`): chi-square tests between pairs of
//!   categorical variables
//! - **Subgroups** (`subgroup`): target proportions or means per category
//!   of a grouping variable
//! - **Temporal Stability** (`temporal`): boolean rates bucketed by period
//!   and classified by trend
//!
//! Every pairwise or per-variable analyzer returns a [`Finding`]; an
//! `Err(InsufficientData)` is an expected outcome on sparse data, never a
//! failure.
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use deep_miner::analyzers::{census_entry, VariableExtractor, VariableType};
//! use deep_miner::config::MinerConfig;
//! use deep_miner::record::{Domain, Record};
//! use serde_json::json;
//!
//! let records: Vec<Record> = (0..10)
//!     .map(|i| {
//!         let data = json!({"shape": if i % 2 == 0 { "disk" } else { "orb" }, "em": i < 3});
//!         Record::new(i.to_string(), Domain::Ufo, Utc::now(), data)
//!     })
//!     .collect();
//!
//! let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&records);
//! let em = extraction.variable("em").unwrap();
//! assert_eq!(em.var_type, VariableType::Boolean);
//!
//! let entry = census_entry(em);
//! assert_eq!(entry.mode.as_deref(), Some("false"));
//! ```

pub mod census;
pub mod cross_tab;
pub mod errors;
pub mod extractor;
pub mod inference;
pub mod subgroup;
pub mod temporal;
pub mod types;

pub use census::{census_entry, VariableCensusEntry};
pub use cross_tab::{candidate_pairs, compute_cross_tab, CrossTabulation, MIN_CROSS_TAB_N};
pub use errors::{Finding, InsufficientData};
pub use extractor::VariableExtractor;
pub use inference::{
    normalize_boolean, parse_temporal, InferredType, TypeInferenceEngine, TypeInferenceResult,
};
pub use subgroup::{
    compute_subgroup_analysis, subgroup_pairs, StatisticKind, SubgroupAnalysis, SubgroupResult,
};
pub use temporal::{
    compute_temporal_stability, locate_date_field, record_dates, temporal_candidates,
    PeriodBucket, TemporalStabilityAnalysis, DATE_FIELD_CANDIDATES,
};
pub use types::{ExtractedVariable, Extraction, VariableType, VariableValue};

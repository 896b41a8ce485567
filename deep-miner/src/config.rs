//! Session configuration.
//!
//! [`MinerConfig`] carries every recognized option with its default. It can
//! be built fluently, deserialized from JSON (missing keys take defaults),
//! and must pass [`MinerConfig::validate`] before a session starts.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, MinerError, Result};
use crate::logging::LogConfig;
use crate::record::Domain;

/// Granularity of the temporal stability buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPeriod {
    #[default]
    Year,
    Quarter,
    Month,
}

impl TemporalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalPeriod::Year => "year",
            TemporalPeriod::Quarter => "quarter",
            TemporalPeriod::Month => "month",
        }
    }
}

/// Options for one mining session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Record partition to analyze
    pub domain: Domain,
    /// Maximum number of records requested from the store
    pub record_limit: usize,
    /// Maximum number of variables kept by the census
    pub max_variables: usize,
    /// Distinct-value ceiling for categorical fields; above it a field is free text
    pub categorical_threshold: usize,
    /// Minimum non-null observations before a path is typed at all
    pub min_non_null: usize,
    /// Share of values that must normalize to a boolean for a boolean type
    pub boolean_confidence: f64,
    /// Maximum number of cross-tabulated pairs
    pub max_cross_tabs: usize,
    pub significance_threshold: f64,
    /// Reserved for per-cell suppression; sparse cells are only reported
    pub min_cell_count: u64,
    pub min_sample_for_subgroup: usize,
    /// Distinct-value ceiling for a grouping variable
    pub max_group_cardinality: usize,
    /// Maximum number of grouping × target analyses
    pub max_subgroup_analyses: usize,
    /// Maximum number of boolean variables checked over time
    pub max_temporal_variables: usize,
    /// Reserved; free-text fields are excluded from the census
    pub include_text_analysis: bool,
    pub temporal_periods: TemporalPeriod,
    /// Worker tasks for the pair loops; 0 means one per CPU
    pub worker_threads: usize,
    /// Wall-clock budget for the whole session
    #[serde(with = "optional_duration_secs")]
    pub time_budget: Option<Duration>,
    pub logging: LogConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Ufo,
            record_limit: 50_000,
            max_variables: 5000,
            categorical_threshold: 50,
            min_non_null: 5,
            boolean_confidence: 0.75,
            max_cross_tabs: 200,
            significance_threshold: 0.05,
            min_cell_count: 5,
            min_sample_for_subgroup: 20,
            max_group_cardinality: 20,
            max_subgroup_analyses: 200,
            max_temporal_variables: 20,
            include_text_analysis: false,
            temporal_periods: TemporalPeriod::Year,
            worker_threads: 1,
            time_budget: None,
            logging: LogConfig::default(),
        }
    }
}

mod optional_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        match secs {
            Some(s) if s.is_finite() && s >= 0.0 => Ok(Some(Duration::from_secs_f64(s))),
            Some(s) => Err(serde::de::Error::custom(format!(
                "time_budget must be a non-negative number of seconds, got {s}"
            ))),
            None => Ok(None),
        }
    }
}

impl MinerConfig {
    /// Default configuration for a domain.
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain,
            ..Self::default()
        }
    }

    /// Parses a JSON configuration; absent keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_json_str(&contents)
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.record_limit = limit;
        self
    }

    pub fn with_max_variables(mut self, max: usize) -> Self {
        self.max_variables = max;
        self
    }

    pub fn with_categorical_threshold(mut self, threshold: usize) -> Self {
        self.categorical_threshold = threshold;
        self
    }

    pub fn with_min_non_null(mut self, min: usize) -> Self {
        self.min_non_null = min;
        self
    }

    pub fn with_boolean_confidence(mut self, confidence: f64) -> Self {
        self.boolean_confidence = confidence;
        self
    }

    pub fn with_max_cross_tabs(mut self, max: usize) -> Self {
        self.max_cross_tabs = max;
        self
    }

    pub fn with_significance_threshold(mut self, threshold: f64) -> Self {
        self.significance_threshold = threshold;
        self
    }

    pub fn with_min_sample_for_subgroup(mut self, min: usize) -> Self {
        self.min_sample_for_subgroup = min;
        self
    }

    pub fn with_max_group_cardinality(mut self, max: usize) -> Self {
        self.max_group_cardinality = max;
        self
    }

    pub fn with_max_subgroup_analyses(mut self, max: usize) -> Self {
        self.max_subgroup_analyses = max;
        self
    }

    pub fn with_max_temporal_variables(mut self, max: usize) -> Self {
        self.max_temporal_variables = max;
        self
    }

    pub fn with_temporal_periods(mut self, period: TemporalPeriod) -> Self {
        self.temporal_periods = period;
        self
    }

    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Number of worker tasks to use for the pair loops.
    pub fn effective_workers(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }

    /// Rejects caps and thresholds that would make a session meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive_caps = [
            ("record_limit", self.record_limit),
            ("max_variables", self.max_variables),
            ("categorical_threshold", self.categorical_threshold),
            ("max_cross_tabs", self.max_cross_tabs),
            ("max_group_cardinality", self.max_group_cardinality),
            ("max_subgroup_analyses", self.max_subgroup_analyses),
            ("max_temporal_variables", self.max_temporal_variables),
        ];
        for (name, value) in positive_caps {
            if value == 0 {
                return Err(MinerError::configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(MinerError::configuration(format!(
                "significance_threshold must be in (0, 1), got {}",
                self.significance_threshold
            )));
        }
        if !(self.boolean_confidence > 0.0 && self.boolean_confidence <= 1.0) {
            return Err(MinerError::configuration(format!(
                "boolean_confidence must be in (0, 1], got {}",
                self.boolean_confidence
            )));
        }
        if self.min_sample_for_subgroup < 2 {
            return Err(MinerError::configuration(
                "min_sample_for_subgroup must be at least 2",
            ));
        }
        if self.min_non_null == 0 {
            return Err(MinerError::configuration("min_non_null must be at least 1"));
        }
        if self.max_group_cardinality < 2 {
            return Err(MinerError::configuration(
                "max_group_cardinality must be at least 2",
            ));
        }
        if matches!(self.time_budget, Some(budget) if budget.is_zero()) {
            return Err(MinerError::configuration("time_budget must be non-zero"));
        }
        Ok(())
    }
}

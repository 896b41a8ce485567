//! Type inference for schemaless field paths.
//!
//! Every non-null observation of a path is tested against the boolean,
//! numeric and date patterns. The path then receives the first type that
//! covers enough of its observations, in this order:
//!
//! 1. Boolean, when the boolean share reaches `boolean_confidence` and no
//!    value is a number other than 0 or 1
//! 2. Continuous, when every value is numeric
//! 3. Temporal, when every value parses as a date
//! 4. Categorical, when the distinct count is at most `categorical_threshold`
//! 5. Free text otherwise
//!
//! Paths with fewer than `min_non_null` observations stay untyped.
//!
//! # Example
//!
//! ```rust
//! use deep_miner::analyzers::inference::{InferredType, TypeInferenceEngine};
//! use serde_json::json;
//!
//! let engine = TypeInferenceEngine::builder().min_non_null(2).build();
//! let values = [json!("yes"), json!(false), json!(1), json!(null)];
//! let result = engine.infer_values(values.iter());
//!
//! assert_eq!(result.inferred_type, InferredType::Boolean);
//! assert_eq!(result.null_count, 1);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{VariableType, VariableValue};
use crate::config::MinerConfig;

/// Configuration for the type inference engine
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Maximum distinct values for a categorical path (default: 50)
    pub categorical_threshold: usize,
    /// Share of values that must be boolean-like (default: 0.75)
    pub boolean_confidence: f64,
    /// Minimum non-null observations before typing (default: 5)
    pub min_non_null: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            categorical_threshold: 50,
            boolean_confidence: 0.75,
            min_non_null: 5,
        }
    }
}

impl From<&MinerConfig> for InferenceConfig {
    fn from(config: &MinerConfig) -> Self {
        Self {
            categorical_threshold: config.categorical_threshold,
            boolean_confidence: config.boolean_confidence,
            min_non_null: config.min_non_null,
        }
    }
}

/// Inferred type of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Boolean,
    Continuous,
    Temporal,
    Categorical { cardinality: usize },
    /// Too many distinct values to tabulate
    FreeText { cardinality: usize },
    /// Too few observations to type
    Sparse,
}

impl InferredType {
    /// The census type, for paths that become variables.
    pub fn variable_type(&self) -> Option<VariableType> {
        match self {
            InferredType::Boolean => Some(VariableType::Boolean),
            InferredType::Continuous => Some(VariableType::Continuous),
            InferredType::Temporal => Some(VariableType::Temporal),
            InferredType::Categorical { .. } => Some(VariableType::Categorical),
            InferredType::FreeText { .. } | InferredType::Sparse => None,
        }
    }
}

/// Type inference result with confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInferenceResult {
    pub inferred_type: InferredType,
    /// Share of non-null values supporting the inferred type
    pub confidence: f64,
    pub samples_analyzed: usize,
    pub null_count: usize,
}

/// Per-path match counters
#[derive(Debug, Default)]
pub struct TypeStats {
    pub total_samples: usize,
    pub null_count: usize,
    pub boolean_matches: usize,
    pub numeric_matches: usize,
    pub temporal_matches: usize,
    /// Numbers that are not boolean-like, such as 2 or 0.5
    pub stray_numbers: usize,
    pub unique_values: HashMap<String, usize>,
}

impl TypeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_null(&self) -> usize {
        self.total_samples - self.null_count
    }
}

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("numeric pattern")
});
static BOOLEAN_TRUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(true|t|yes|y|1)$").expect("boolean pattern"));
static BOOLEAN_FALSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(false|f|no|n|0)$").expect("boolean pattern"));
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}:\d{2}.*)?|\d{1,2}/\d{1,2}/\d{4})$")
        .expect("date pattern")
});

/// Whether a JSON value counts as missing.
pub fn is_null_like(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Normalizes boolean representations.
///
/// Accepts JSON booleans, the numbers 0 and 1, and the strings
/// true/t/yes/y/1 and false/f/no/n/0 in any case.
pub fn normalize_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Some(true),
            Some(x) if x == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if BOOLEAN_TRUE.is_match(trimmed) {
                Some(true)
            } else if BOOLEAN_FALSE.is_match(trimmed) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parses a finite number from a JSON number or numeric string.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if NUMERIC.is_match(trimmed) {
                trimmed.parse::<f64>().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

/// Parses a date string.
///
/// Accepted: RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` (both with optional fractional seconds) and
/// `MM/DD/YYYY`. Naive values are taken as UTC. Numbers are never dates.
pub fn parse_temporal(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if !DATE_SHAPE.is_match(raw) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Category key of a value; `None` when the value is null-like.
pub fn category_key(value: &Value) -> Option<String> {
    if is_null_like(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

/// Converts a raw value into the representation of `var_type`.
///
/// Values that do not conform (a stray string in a boolean path, say)
/// become `None`.
pub fn normalize_value(value: &Value, var_type: VariableType) -> Option<VariableValue> {
    match var_type {
        VariableType::Boolean => normalize_boolean(value).map(VariableValue::Bool),
        VariableType::Continuous => parse_numeric(value).map(VariableValue::Number),
        VariableType::Temporal => parse_temporal(value).map(VariableValue::Date),
        VariableType::Categorical => category_key(value).map(VariableValue::Text),
    }
}

/// Builder for TypeInferenceEngine
pub struct TypeInferenceEngineBuilder {
    config: InferenceConfig,
}

impl TypeInferenceEngineBuilder {
    pub fn categorical_threshold(mut self, threshold: usize) -> Self {
        self.config.categorical_threshold = threshold;
        self
    }

    pub fn boolean_confidence(mut self, confidence: f64) -> Self {
        self.config.boolean_confidence = confidence;
        self
    }

    pub fn min_non_null(mut self, min: usize) -> Self {
        self.config.min_non_null = min;
        self
    }

    pub fn build(self) -> TypeInferenceEngine {
        TypeInferenceEngine {
            config: self.config,
        }
    }
}

/// Assigns a type to the observations of one path.
#[derive(Debug, Clone)]
pub struct TypeInferenceEngine {
    config: InferenceConfig,
}

impl TypeInferenceEngine {
    pub fn builder() -> TypeInferenceEngineBuilder {
        TypeInferenceEngineBuilder {
            config: InferenceConfig::default(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infers the type of a path from its raw observations.
    pub fn infer_values<'a>(
        &self,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> TypeInferenceResult {
        let stats = self.analyze_values(values);
        self.determine_type(&stats)
    }

    /// Collects match counters over raw observations.
    pub fn analyze_values<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> TypeStats {
        let mut stats = TypeStats::new();
        for value in values {
            stats.total_samples += 1;
            let Some(key) = category_key(value) else {
                stats.null_count += 1;
                continue;
            };
            *stats.unique_values.entry(key).or_insert(0) += 1;
            self.test_patterns(value, &mut stats);
        }
        stats
    }

    /// Tests a non-null value against every pattern
    pub fn test_patterns(&self, value: &Value, stats: &mut TypeStats) {
        let boolean = normalize_boolean(value).is_some();
        if boolean {
            stats.boolean_matches += 1;
        }
        if parse_numeric(value).is_some() {
            stats.numeric_matches += 1;
            if !boolean {
                stats.stray_numbers += 1;
            }
        }
        if parse_temporal(value).is_some() {
            stats.temporal_matches += 1;
        }
    }

    /// Determines the type from collected counters.
    pub fn determine_type(&self, stats: &TypeStats) -> TypeInferenceResult {
        let non_null = stats.non_null();
        let result = |inferred_type, confidence| TypeInferenceResult {
            inferred_type,
            confidence,
            samples_analyzed: stats.total_samples,
            null_count: stats.null_count,
        };

        if non_null == 0 || non_null < self.config.min_non_null {
            return result(InferredType::Sparse, 0.0);
        }

        let share = |matches: usize| matches as f64 / non_null as f64;
        let cardinality = stats.unique_values.len();

        let boolean_like = stats.stray_numbers == 0
            && share(stats.boolean_matches) >= self.config.boolean_confidence;

        if boolean_like {
            result(InferredType::Boolean, share(stats.boolean_matches))
        } else if stats.numeric_matches == non_null {
            result(InferredType::Continuous, 1.0)
        } else if stats.temporal_matches == non_null {
            result(InferredType::Temporal, 1.0)
        } else if cardinality <= self.config.categorical_threshold {
            result(InferredType::Categorical { cardinality }, 1.0)
        } else {
            result(InferredType::FreeText { cardinality }, 1.0)
        }
    }
}

impl Default for TypeInferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn engine() -> TypeInferenceEngine {
        TypeInferenceEngine::builder().min_non_null(1).build()
    }

    #[test]
    fn test_inference_engine_builder() {
        let engine = TypeInferenceEngine::builder()
            .categorical_threshold(10)
            .boolean_confidence(0.9)
            .min_non_null(3)
            .build();
        assert_eq!(engine.config().categorical_threshold, 10);
        assert_eq!(engine.config().boolean_confidence, 0.9);
        assert_eq!(engine.config().min_non_null, 3);
    }

    #[test]
    fn test_config_from_miner_config() {
        let miner = MinerConfig::default().with_categorical_threshold(7);
        let config = InferenceConfig::from(&miner);
        assert_eq!(config.categorical_threshold, 7);
        assert_eq!(config.min_non_null, 5);
    }

    #[test]
    fn test_normalize_boolean() {
        assert_eq!(normalize_boolean(&json!(true)), Some(true));
        assert_eq!(normalize_boolean(&json!(0)), Some(false));
        assert_eq!(normalize_boolean(&json!(1.0)), Some(true));
        assert_eq!(normalize_boolean(&json!("YES")), Some(true));
        assert_eq!(normalize_boolean(&json!(" n ")), Some(false));
        assert_eq!(normalize_boolean(&json!("T")), Some(true));
        assert_eq!(normalize_boolean(&json!(2)), None);
        assert_eq!(normalize_boolean(&json!("maybe")), None);
        assert_eq!(normalize_boolean(&json!("on")), None);
        assert_eq!(normalize_boolean(&json!(null)), None);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(&json!(3)), Some(3.0));
        assert_eq!(parse_numeric(&json!("12.5")), Some(12.5));
        assert_eq!(parse_numeric(&json!(" -4 ")), Some(-4.0));
        assert_eq!(parse_numeric(&json!("1e3")), Some(1000.0));
        assert_eq!(parse_numeric(&json!("12 km")), None);
        assert_eq!(parse_numeric(&json!(true)), None);
        assert_eq!(parse_numeric(&json!("NaN")), None);
    }

    #[test]
    fn test_parse_temporal_formats() {
        let rfc = parse_temporal(&json!("2021-06-01T22:15:00-07:00")).unwrap();
        assert_eq!(rfc.hour(), 5);
        assert_eq!(rfc.day(), 2);

        let naive = parse_temporal(&json!("2021-06-01 22:15:00")).unwrap();
        assert_eq!(naive.hour(), 22);

        let t_sep = parse_temporal(&json!("2021-06-01T22:15:00")).unwrap();
        assert_eq!(t_sep, naive);

        let date = parse_temporal(&json!("2019-03-04")).unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2019, 3, 4));

        let us = parse_temporal(&json!("12/25/2020")).unwrap();
        assert_eq!((us.year(), us.month(), us.day()), (2020, 12, 25));

        assert!(parse_temporal(&json!("2021-02-30")).is_none());
        assert!(parse_temporal(&json!("last tuesday")).is_none());
        assert!(parse_temporal(&json!(20210601)).is_none());
    }

    #[test]
    fn test_analyze_values_with_nulls() {
        let values = [json!(1), json!(null), json!(""), json!(2.5), json!([])];
        let stats = engine().analyze_values(values.iter());
        assert_eq!(stats.total_samples, 5);
        assert_eq!(stats.null_count, 3);
        assert_eq!(stats.numeric_matches, 2);
        assert_eq!(stats.boolean_matches, 1);
        assert_eq!(stats.unique_values.len(), 2);
    }

    #[test]
    fn test_determine_type_boolean_before_numeric() {
        let values = [json!(0), json!(1), json!("yes"), json!(false)];
        let result = engine().infer_values(values.iter());
        assert_eq!(result.inferred_type, InferredType::Boolean);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_determine_type_boolean_confidence() {
        let values = [json!(true), json!(false), json!(true), json!("unknown")];
        let lenient = engine().infer_values(values.iter());
        assert_eq!(lenient.inferred_type, InferredType::Boolean);
        assert_eq!(lenient.confidence, 0.75);

        let strict = TypeInferenceEngine::builder()
            .min_non_null(1)
            .boolean_confidence(1.0)
            .build()
            .infer_values(values.iter());
        assert_eq!(strict.inferred_type, InferredType::Categorical { cardinality: 3 });

        let mostly_unknown = [json!("yes"), json!("unknown"), json!("maybe"), json!("no")];
        assert_eq!(
            engine().infer_values(mostly_unknown.iter()).inferred_type,
            InferredType::Categorical { cardinality: 4 }
        );
    }

    #[test]
    fn test_counts_with_zeros_and_ones_stay_continuous() {
        let values = [0, 1, 1, 0, 1, 0, 1, 3].map(|n| json!(n));
        let stats = engine().analyze_values(values.iter());
        assert_eq!(stats.stray_numbers, 1);
        assert_eq!(
            engine().infer_values(values.iter()).inferred_type,
            InferredType::Continuous
        );
    }

    #[test]
    fn test_determine_type_continuous_and_temporal() {
        let numbers = [json!(12), json!("3.5"), json!(7)];
        assert_eq!(
            engine().infer_values(numbers.iter()).inferred_type,
            InferredType::Continuous
        );

        let dates = [json!("2020-01-01"), json!("03/15/2021"), json!("2022-07-04T10:00:00Z")];
        assert_eq!(
            engine().infer_values(dates.iter()).inferred_type,
            InferredType::Temporal
        );
    }

    #[test]
    fn test_determine_type_categorical_vs_free_text() {
        let engine = TypeInferenceEngine::builder()
            .min_non_null(1)
            .categorical_threshold(3)
            .build();
        let shapes = [json!("disk"), json!("light"), json!("disk"), json!("triangle")];
        assert_eq!(
            engine.infer_values(shapes.iter()).inferred_type,
            InferredType::Categorical { cardinality: 3 }
        );

        let notes = [json!("a"), json!("b"), json!("c"), json!("d")];
        let result = engine.infer_values(notes.iter());
        assert_eq!(result.inferred_type, InferredType::FreeText { cardinality: 4 });
        assert_eq!(result.inferred_type.variable_type(), None);
    }

    #[test]
    fn test_determine_type_sparse() {
        let engine = TypeInferenceEngine::builder().min_non_null(3).build();
        let values = [json!("disk"), json!(null), json!("light")];
        let result = engine.infer_values(values.iter());
        assert_eq!(result.inferred_type, InferredType::Sparse);
        assert_eq!(result.null_count, 1);

        let empty: [Value; 0] = [];
        assert_eq!(
            engine.infer_values(empty.iter()).inferred_type,
            InferredType::Sparse
        );
    }

    #[test]
    fn test_normalize_value_drops_nonconforming() {
        assert_eq!(
            normalize_value(&json!("yes"), VariableType::Boolean),
            Some(VariableValue::Bool(true))
        );
        assert_eq!(normalize_value(&json!("maybe"), VariableType::Boolean), None);
        assert_eq!(
            normalize_value(&json!(" disk "), VariableType::Categorical),
            Some(VariableValue::Text("disk".to_string()))
        );
        assert_eq!(
            normalize_value(&json!(4), VariableType::Categorical),
            Some(VariableValue::Text("4".to_string()))
        );
    }
}

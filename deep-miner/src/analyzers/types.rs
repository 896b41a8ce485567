//! Typed variables produced by the census and consumed by every analyzer.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistical type assigned to a discovered field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Categorical,
    Boolean,
    Continuous,
    Temporal,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Categorical => "categorical",
            VariableType::Boolean => "boolean",
            VariableType::Continuous => "continuous",
            VariableType::Temporal => "temporal",
        }
    }

    /// Whether values of this type can index a contingency table.
    pub fn is_categorical_like(&self) -> bool {
        matches!(self, VariableType::Categorical | VariableType::Boolean)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl VariableValue {
    /// Label used as a contingency-table or subgroup key.
    pub fn category_label(&self) -> String {
        match self {
            VariableValue::Bool(b) => b.to_string(),
            VariableValue::Number(n) => n.to_string(),
            VariableValue::Text(s) => s.clone(),
            VariableValue::Date(d) => d.to_rfc3339(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            VariableValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            VariableValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A typed field path with one slot per record, aligned by record index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedVariable {
    /// Display name (last path segment)
    pub name: String,
    pub path: String,
    pub var_type: VariableType,
    pub values: Vec<Option<VariableValue>>,
}

impl ExtractedVariable {
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Category label of record `index`, if present.
    pub fn category(&self, index: usize) -> Option<String> {
        self.values
            .get(index)
            .and_then(|v| v.as_ref())
            .map(VariableValue::category_label)
    }

    /// Distinct category labels across all records.
    pub fn categories(&self) -> BTreeSet<String> {
        self.values
            .iter()
            .flatten()
            .map(VariableValue::category_label)
            .collect()
    }

    pub fn distinct_count(&self) -> usize {
        self.categories().len()
    }
}

/// Output of the census pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub total_records: usize,
    /// Typed variables, in discovery order
    pub variables: Vec<ExtractedVariable>,
    /// Paths excluded as high-cardinality text
    pub free_text_paths: Vec<String>,
    /// Paths with too few non-null observations to type
    pub sparse_paths: Vec<String>,
    /// Typed paths dropped by the variable cap
    pub dropped_by_cap: usize,
}

impl Extraction {
    pub fn variable(&self, path: &str) -> Option<&ExtractedVariable> {
        self.variables.iter().find(|v| v.path == path)
    }

    pub fn count_by_type(&self, var_type: VariableType) -> usize {
        self.variables
            .iter()
            .filter(|v| v.var_type == var_type)
            .count()
    }
}

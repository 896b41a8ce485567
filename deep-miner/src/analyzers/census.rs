//! Per-variable census entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ExtractedVariable, VariableType, VariableValue};
use crate::stats::{
    calculate_descriptive_stats, determine_distribution_shape, DescriptiveStats,
    DistributionShape,
};

/// Summary of one variable, persisted in the census phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableCensusEntry {
    #[serde(rename = "variable_name")]
    pub variable: String,
    #[serde(rename = "variable_path")]
    pub path: String,
    #[serde(rename = "variable_type")]
    pub var_type: VariableType,
    #[serde(rename = "total_records")]
    pub total: usize,
    #[serde(rename = "non_null_count")]
    pub non_null: usize,
    pub null_count: usize,
    pub missing_rate: f64,
    pub distinct_count: usize,
    /// Counts per category (categorical and boolean only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_distribution: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Summary of a continuous variable
    #[serde(rename = "continuous", skip_serializing_if = "Option::is_none")]
    pub stats: Option<DescriptiveStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_shape: Option<DistributionShape>,
    #[serde(rename = "earliest_date", skip_serializing_if = "Option::is_none")]
    pub earliest: Option<DateTime<Utc>>,
    #[serde(rename = "latest_date", skip_serializing_if = "Option::is_none")]
    pub latest: Option<DateTime<Utc>>,
}

/// Summarizes one extracted variable.
pub fn census_entry(variable: &ExtractedVariable) -> VariableCensusEntry {
    let total = variable.values.len();
    let present: Vec<&VariableValue> = variable.values.iter().flatten().collect();
    let non_null = present.len();
    let missing_rate = if total == 0 {
        0.0
    } else {
        (total - non_null) as f64 / total as f64
    };

    let mut entry = VariableCensusEntry {
        variable: variable.name.clone(),
        path: variable.path.clone(),
        var_type: variable.var_type,
        total,
        non_null,
        null_count: total - non_null,
        missing_rate,
        distinct_count: variable.distinct_count(),
        value_distribution: None,
        mode: None,
        stats: None,
        distribution_shape: None,
        earliest: None,
        latest: None,
    };

    match variable.var_type {
        VariableType::Categorical | VariableType::Boolean => {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for value in &present {
                *counts.entry(value.category_label()).or_insert(0) += 1;
            }
            // strict comparison keeps the first key on ties
            let mut mode: Option<(&String, u64)> = None;
            for (label, &count) in &counts {
                if mode.map_or(true, |(_, best)| count > best) {
                    mode = Some((label, count));
                }
            }
            entry.mode = mode.map(|(label, _)| label.clone());
            entry.value_distribution = Some(counts);
        }
        VariableType::Continuous => {
            let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_number()).collect();
            entry.stats = calculate_descriptive_stats(&numbers);
            if entry.stats.is_some() {
                entry.distribution_shape = Some(determine_distribution_shape(&numbers));
            }
        }
        VariableType::Temporal => {
            let dates = present.iter().filter_map(|v| v.as_date());
            entry.earliest = dates.clone().min();
            entry.latest = dates.max();
        }
    }
    entry
}

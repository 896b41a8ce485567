//! Pairwise cross-tabulation of categorical and boolean variables.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::{Finding, InsufficientData};
use super::types::ExtractedVariable;
use crate::stats::{
    categorize_effect_size, chi_square_test, format_p_value, significance_stars,
    ContingencyTable, EffectSize,
};

/// Records with both values present needed before a pair is tested.
pub const MIN_CROSS_TAB_N: usize = 30;

/// Association test between two categorical variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTabulation {
    pub variable_a: String,
    #[serde(rename = "variable_a_path")]
    pub path_a: String,
    pub variable_b: String,
    #[serde(rename = "variable_b_path")]
    pub path_b: String,
    /// Rows are categories of `variable_a`, columns of `variable_b`
    #[serde(rename = "contingency_table")]
    pub table: ContingencyTable,
    /// Records considered, including those missing either value
    pub total_n: usize,
    pub valid_n: usize,
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub cramers_v: f64,
    #[serde(rename = "effect_size_category")]
    pub effect_size: EffectSize,
    #[serde(rename = "significant")]
    pub is_significant: bool,
    /// Cells with an expected count below 5
    pub sparse_cells: usize,
    pub interpretation: String,
}

/// Indices of variables that can enter a contingency table.
pub fn cross_tab_candidates(variables: &[ExtractedVariable]) -> Vec<usize> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.var_type.is_categorical_like())
        .map(|(i, _)| i)
        .collect()
}

/// Unordered candidate pairs in discovery order, capped at `max_pairs`.
///
/// Each path pair appears once; a path is never paired with itself.
pub fn candidate_pairs(variables: &[ExtractedVariable], max_pairs: usize) -> Vec<(usize, usize)> {
    let candidates = cross_tab_candidates(variables);
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut pairs = Vec::new();

    'outer: for (pos, &i) in candidates.iter().enumerate() {
        for &j in &candidates[pos + 1..] {
            if pairs.len() >= max_pairs {
                break 'outer;
            }
            let (a, b) = (variables[i].path.as_str(), variables[j].path.as_str());
            if a == b {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            if seen.insert(key) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Counts co-occurring categories over records where both are present.
pub fn build_contingency_table(
    a: &ExtractedVariable,
    b: &ExtractedVariable,
) -> (ContingencyTable, usize) {
    let mut table = ContingencyTable::new();
    let mut valid_n = 0;
    for index in 0..a.values.len().min(b.values.len()) {
        if let (Some(row), Some(column)) = (a.category(index), b.category(index)) {
            *table.entry(row).or_default().entry(column).or_insert(0) += 1;
            valid_n += 1;
        }
    }
    (table, valid_n)
}

/// Cross-tabulates two variables and tests them for independence.
pub fn compute_cross_tab(
    a: &ExtractedVariable,
    b: &ExtractedVariable,
    significance_threshold: f64,
) -> Finding<CrossTabulation> {
    let (table, valid_n) = build_contingency_table(a, b);
    if valid_n < MIN_CROSS_TAB_N {
        return Err(InsufficientData::TooFewValidRecords {
            valid_n,
            required: MIN_CROSS_TAB_N,
        });
    }

    let rows = table.len();
    let columns = table
        .values()
        .flat_map(|row| row.keys())
        .collect::<HashSet<_>>()
        .len();
    if rows < 2 {
        return Err(InsufficientData::TooFewCategories {
            variable: a.name.clone(),
            observed: rows,
        });
    }
    if columns < 2 {
        return Err(InsufficientData::TooFewCategories {
            variable: b.name.clone(),
            observed: columns,
        });
    }

    let result = chi_square_test(&table).ok_or(InsufficientData::DegenerateTable)?;
    let effect_size = categorize_effect_size(result.cramers_v, rows.min(columns) - 1);
    let is_significant = result.p_value < significance_threshold;

    let mut interpretation = format!(
        "{} × {}: χ²({}) = {:.2}, {}{}, Cramér's V = {:.3} ({} effect); {} at α = {}",
        a.name,
        b.name,
        result.degrees_of_freedom,
        result.chi_square,
        p_label(result.p_value),
        significance_stars(result.p_value),
        result.cramers_v,
        effect_size,
        if is_significant {
            "significant"
        } else {
            "not significant"
        },
        significance_threshold,
    );
    if result.sparse_cells > 0 {
        interpretation.push_str(&format!(
            "; {} of {} cells have expected counts below 5",
            result.sparse_cells,
            rows * columns
        ));
    }

    Ok(CrossTabulation {
        variable_a: a.name.clone(),
        path_a: a.path.clone(),
        variable_b: b.name.clone(),
        path_b: b.path.clone(),
        table,
        total_n: a.values.len().max(b.values.len()),
        valid_n,
        chi_square: result.chi_square,
        degrees_of_freedom: result.degrees_of_freedom,
        p_value: result.p_value,
        cramers_v: result.cramers_v,
        effect_size,
        is_significant,
        sparse_cells: result.sparse_cells,
        interpretation,
    })
}

fn p_label(p_value: f64) -> String {
    let formatted = format_p_value(p_value);
    if formatted.starts_with('<') {
        format!("p {formatted}")
    } else {
        format!("p = {formatted}")
    }
}

//! Pearson's chi-square test of independence on a two-way count table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::distribution::chi_square_survival;

/// Two-way table of counts: row category -> column category -> count.
///
/// Missing inner entries are zero counts.
pub type ContingencyTable = BTreeMap<String, BTreeMap<String, u64>>;

/// Expected cell counts below this make the chi-square approximation shaky.
pub const SPARSE_EXPECTED_COUNT: f64 = 5.0;

/// Outcome of [`chi_square_test`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareResult {
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub cramers_v: f64,
    /// Cells whose expected count is below [`SPARSE_EXPECTED_COUNT`].
    pub sparse_cells: usize,
    /// Grand total of the table.
    pub n: u64,
}

/// Cohen's qualitative bands for Cramér's V.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectSize::Negligible => "negligible",
            EffectSize::Small => "small",
            EffectSize::Medium => "medium",
            EffectSize::Large => "large",
        }
    }
}

impl std::fmt::Display for EffectSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs a chi-square test of independence.
///
/// Returns `None` when the table has fewer than two rows or columns, or when
/// any row or column total is zero (expected counts would be undefined).
/// The statistic, p-value and degrees of freedom do not depend on which
/// variable is on the rows.
pub fn chi_square_test(table: &ContingencyTable) -> Option<ChiSquareResult> {
    let columns: BTreeSet<&str> = table
        .values()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let row_count = table.len();
    let column_count = columns.len();
    if row_count < 2 || column_count < 2 {
        return None;
    }

    let row_totals: Vec<u64> = table.values().map(|row| row.values().sum()).collect();
    let column_totals: Vec<u64> = columns
        .iter()
        .map(|column| {
            table
                .values()
                .map(|row| row.get(*column).copied().unwrap_or(0))
                .sum()
        })
        .collect();

    if row_totals.iter().chain(column_totals.iter()).any(|&t| t == 0) {
        return None;
    }

    let n: u64 = row_totals.iter().sum();
    let n_f = n as f64;

    let mut chi_square = 0.0;
    let mut sparse_cells = 0;
    for (row, &row_total) in table.values().zip(&row_totals) {
        for (column, &column_total) in columns.iter().zip(&column_totals) {
            let observed = row.get(*column).copied().unwrap_or(0) as f64;
            let expected = row_total as f64 * column_total as f64 / n_f;
            if expected < SPARSE_EXPECTED_COUNT {
                sparse_cells += 1;
            }
            chi_square += (observed - expected).powi(2) / expected;
        }
    }

    let degrees_of_freedom = (row_count - 1) * (column_count - 1);
    let p_value = chi_square_survival(chi_square, degrees_of_freedom);
    let min_dimension = (row_count.min(column_count) - 1) as f64;
    let cramers_v = (chi_square / (n_f * min_dimension)).sqrt().min(1.0);

    Some(ChiSquareResult {
        chi_square,
        degrees_of_freedom,
        p_value,
        cramers_v,
        sparse_cells,
        n,
    })
}

/// Maps Cramér's V onto Cohen's bands.
///
/// `df` is the smaller table dimension minus one; thresholds shrink as it
/// grows (1: .10/.30/.50, 2: .07/.21/.35, 3: .06/.17/.29, 4+: .05/.15/.25).
pub fn categorize_effect_size(cramers_v: f64, df: usize) -> EffectSize {
    let (small, medium, large) = match df {
        0 | 1 => (0.10, 0.30, 0.50),
        2 => (0.07, 0.21, 0.35),
        3 => (0.06, 0.17, 0.29),
        _ => (0.05, 0.15, 0.25),
    };

    if cramers_v >= large {
        EffectSize::Large
    } else if cramers_v >= medium {
        EffectSize::Medium
    } else if cramers_v >= small {
        EffectSize::Small
    } else {
        EffectSize::Negligible
    }
}

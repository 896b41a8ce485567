//! Subgroup comparison: how a target variable behaves within each category
//! of a low-cardinality grouping variable.
//!
//! Boolean targets are compared by proportion (with a Wilson interval per
//! group), continuous targets by mean. Groups smaller than the configured
//! minimum are excluded and counted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::{Finding, InsufficientData};
use super::types::{ExtractedVariable, VariableType, VariableValue};
use crate::stats::{format_percent, proportion_ci};

/// Absolute proportion gap that marks a boolean subgroup as different.
pub const PROPORTION_DIFFERENCE: f64 = 0.1;

/// Relative mean gap that marks a continuous subgroup as different.
pub const RELATIVE_MEAN_DIFFERENCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    Proportion,
    Mean,
}

impl StatisticKind {
    fn format(&self, value: f64) -> String {
        match self {
            StatisticKind::Proportion => format_percent(value),
            StatisticKind::Mean => format!("{value:.2}"),
        }
    }
}

/// One qualifying subgroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupResult {
    #[serde(rename = "name")]
    pub group: String,
    pub n: usize,
    /// Proportion of `true` or mean of the target within the group
    pub statistic: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
    pub differs_from_overall: bool,
}

/// Target behavior across the categories of a grouping variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupAnalysis {
    pub grouping_variable: String,
    pub grouping_path: String,
    pub target_variable: String,
    pub target_path: String,
    pub statistic_kind: StatisticKind,
    pub overall_statistic: f64,
    /// Records with both values present
    pub overall_n: usize,
    /// Sorted by statistic, highest first
    pub subgroups: Vec<SubgroupResult>,
    /// Groups below the minimum size
    pub excluded_groups: usize,
    pub notable_findings: Vec<String>,
}

/// Variables usable as groupings: categorical or boolean with between two
/// and `max_cardinality` observed categories.
pub fn grouping_candidates(variables: &[ExtractedVariable], max_cardinality: usize) -> Vec<usize> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.var_type.is_categorical_like())
        .filter(|(_, v)| (2..=max_cardinality).contains(&v.distinct_count()))
        .map(|(i, _)| i)
        .collect()
}

/// Variables usable as targets: boolean or continuous.
pub fn target_candidates(variables: &[ExtractedVariable]) -> Vec<usize> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v.var_type, VariableType::Boolean | VariableType::Continuous))
        .map(|(i, _)| i)
        .collect()
}

/// (grouping, target) pairs, grouping-major, capped at `max_pairs`.
pub fn subgroup_pairs(
    variables: &[ExtractedVariable],
    max_cardinality: usize,
    max_pairs: usize,
) -> Vec<(usize, usize)> {
    let targets = target_candidates(variables);
    grouping_candidates(variables, max_cardinality)
        .into_iter()
        .flat_map(|g| targets.iter().map(move |&t| (g, t)))
        .filter(|&(g, t)| variables[g].path != variables[t].path)
        .take(max_pairs)
        .collect()
}

#[derive(Default)]
struct GroupAccumulator {
    n: usize,
    successes: u64,
    sum: f64,
}

fn target_value(value: &VariableValue, kind: StatisticKind) -> Option<f64> {
    match kind {
        StatisticKind::Proportion => value.as_bool().map(|b| if b { 1.0 } else { 0.0 }),
        StatisticKind::Mean => value.as_number(),
    }
}

fn differs(kind: StatisticKind, statistic: f64, overall: f64) -> bool {
    match kind {
        StatisticKind::Proportion => (statistic - overall).abs() > PROPORTION_DIFFERENCE,
        StatisticKind::Mean if overall == 0.0 => statistic.abs() > RELATIVE_MEAN_DIFFERENCE,
        StatisticKind::Mean => {
            ((statistic - overall) / overall).abs() > RELATIVE_MEAN_DIFFERENCE
        }
    }
}

/// Compares `target` across the categories of `grouping`.
pub fn compute_subgroup_analysis(
    grouping: &ExtractedVariable,
    target: &ExtractedVariable,
    min_sample: usize,
) -> Finding<SubgroupAnalysis> {
    let kind = match target.var_type {
        VariableType::Boolean => StatisticKind::Proportion,
        VariableType::Continuous => StatisticKind::Mean,
        var_type => {
            return Err(InsufficientData::UnsupportedType {
                variable: target.name.clone(),
                var_type,
            })
        }
    };

    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut overall = GroupAccumulator::default();
    for index in 0..grouping.values.len().min(target.values.len()) {
        let Some(group) = grouping.category(index) else {
            continue;
        };
        let Some(value) = target.values[index].as_ref().and_then(|v| target_value(v, kind)) else {
            continue;
        };
        for acc in [groups.entry(group).or_default(), &mut overall] {
            acc.n += 1;
            acc.sum += value;
            if value > 0.5 {
                acc.successes += 1;
            }
        }
    }

    let (qualifying, excluded): (Vec<_>, Vec<_>) =
        groups.into_iter().partition(|(_, acc)| acc.n >= min_sample);
    if qualifying.len() < 2 {
        return Err(InsufficientData::TooFewGroups {
            qualifying: qualifying.len(),
            min_size: min_sample,
        });
    }

    let overall_statistic = overall.sum / overall.n as f64;
    let mut subgroups: Vec<SubgroupResult> = qualifying
        .into_iter()
        .map(|(group, acc)| {
            let statistic = acc.sum / acc.n as f64;
            let interval = match kind {
                StatisticKind::Proportion => proportion_ci(acc.successes, acc.n as u64),
                StatisticKind::Mean => None,
            };
            SubgroupResult {
                group,
                n: acc.n,
                statistic,
                ci_lower: interval.map(|ci| ci.lower),
                ci_upper: interval.map(|ci| ci.upper),
                differs_from_overall: differs(kind, statistic, overall_statistic),
            }
        })
        .collect();
    subgroups.sort_by(|a, b| {
        b.statistic
            .total_cmp(&a.statistic)
            .then_with(|| a.group.cmp(&b.group))
    });

    let notable_findings = notable_findings(grouping, target, kind, overall_statistic, &subgroups);

    Ok(SubgroupAnalysis {
        grouping_variable: grouping.name.clone(),
        grouping_path: grouping.path.clone(),
        target_variable: target.name.clone(),
        target_path: target.path.clone(),
        statistic_kind: kind,
        overall_statistic,
        overall_n: overall.n,
        subgroups,
        excluded_groups: excluded.len(),
        notable_findings,
    })
}

fn notable_findings(
    grouping: &ExtractedVariable,
    target: &ExtractedVariable,
    kind: StatisticKind,
    overall: f64,
    subgroups: &[SubgroupResult],
) -> Vec<String> {
    let mut findings = Vec::new();
    let (Some(highest), Some(lowest)) = (subgroups.first(), subgroups.last()) else {
        return findings;
    };
    findings.push(format!(
        "Highest {} when {} = {}: {} (n = {})",
        target.name,
        grouping.name,
        highest.group,
        kind.format(highest.statistic),
        highest.n
    ));
    findings.push(format!(
        "Lowest {} when {} = {}: {} (n = {})",
        target.name,
        grouping.name,
        lowest.group,
        kind.format(lowest.statistic),
        lowest.n
    ));
    let differing = subgroups.iter().filter(|s| s.differs_from_overall).count();
    if differing > 0 {
        findings.push(format!(
            "{} of {} groups differ from the overall {}",
            differing,
            subgroups.len(),
            kind.format(overall)
        ));
    }
    findings
}

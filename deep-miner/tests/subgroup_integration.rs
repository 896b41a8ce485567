//! Subgroup comparisons over extracted record sets.

mod common;

use common::*;
use deep_miner::analyzers::{
    compute_subgroup_analysis, subgroup_pairs, InsufficientData, StatisticKind, VariableExtractor,
};
use deep_miner::prelude::*;

fn extract(records: &[Record]) -> deep_miner::analyzers::Extraction {
    VariableExtractor::new(&MinerConfig::default()).extract(records)
}

#[test]
fn test_small_groups_are_skipped_at_default_minimum() {
    let extraction = extract(&scenario_c());
    let group = extraction.variable("group").unwrap();
    let target = extraction.variable("target").unwrap();

    let min_sample = MinerConfig::default().min_sample_for_subgroup;
    let err = compute_subgroup_analysis(group, target, min_sample).unwrap_err();
    assert_eq!(
        err,
        InsufficientData::TooFewGroups {
            qualifying: 0,
            min_size: 20,
        }
    );
}

#[tokio::test]
async fn test_small_groups_produce_no_rows_in_a_session() {
    let (miner, sink) = in_memory_miner(scenario_c(), MinerConfig::for_domain(Domain::Nde));
    let report = miner.run().await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.session.stats.subgroups_analyzed, 0);
    assert!(report.findings.subgroups.is_empty());
    assert!(sink.subgroup_analyses().await.is_empty());

    let phase = report.phase(Phase::Subgroups).unwrap();
    assert!(phase.evaluated > 0);
    assert_eq!(phase.insufficient, phase.evaluated);
}

#[test]
fn test_lower_minimum_admits_both_groups() {
    let extraction = extract(&scenario_c());
    let group = extraction.variable("group").unwrap();
    let target = extraction.variable("target").unwrap();

    let analysis = compute_subgroup_analysis(group, target, 10).unwrap();
    assert_eq!(analysis.statistic_kind, StatisticKind::Proportion);
    assert_eq!(analysis.overall_n, 25);
    assert!((analysis.overall_statistic - 0.44).abs() < 1e-12);
    assert_eq!(analysis.excluded_groups, 0);

    let a = &analysis.subgroups[0];
    let b = &analysis.subgroups[1];
    assert_eq!((a.group.as_str(), a.n), ("A", 10));
    assert_eq!((b.group.as_str(), b.n), ("B", 15));
    assert!((a.statistic - 0.9).abs() < 1e-12);
    assert!(a.differs_from_overall && b.differs_from_overall);
    for subgroup in &analysis.subgroups {
        let (lower, upper) = (subgroup.ci_lower.unwrap(), subgroup.ci_upper.unwrap());
        assert!(lower <= subgroup.statistic && subgroup.statistic <= upper);
    }
    assert_eq!(
        analysis.notable_findings[0],
        "Highest target when group = A: 90.0% (n = 10)"
    );
    assert_eq!(
        analysis.notable_findings[2],
        "2 of 2 groups differ from the overall 44.0%"
    );
}

#[test]
fn test_continuous_target_compares_means() {
    let extraction = extract(&ufo_sightings(120));
    let shape = extraction.variable("shape").unwrap();
    let witnesses = extraction.variable("witnesses").unwrap();

    let analysis = compute_subgroup_analysis(shape, witnesses, 20).unwrap();
    assert_eq!(analysis.statistic_kind, StatisticKind::Mean);
    assert!((analysis.overall_statistic - 3.5).abs() < 1e-12);

    let order: Vec<&str> = analysis.subgroups.iter().map(|s| s.group.as_str()).collect();
    assert_eq!(order, vec!["cigar", "orb", "disk", "triangle"]);
    assert!(analysis.subgroups.iter().all(|s| s.n == 30));
    assert!(analysis.subgroups.iter().all(|s| s.ci_lower.is_none()));
    // 4.0 vs 3.5 is within the relative threshold
    assert!(analysis.subgroups.iter().all(|s| !s.differs_from_overall));
    assert_eq!(analysis.notable_findings.len(), 2);
    assert_eq!(
        analysis.notable_findings[0],
        "Highest witnesses when shape = cigar: 4.00 (n = 30)"
    );
}

#[test]
fn test_pairs_are_grouping_major_without_self_pairs() {
    let extraction = extract(&ufo_sightings(120));
    let paths = |pairs: &[(usize, usize)]| -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|&(g, t)| {
                (
                    extraction.variables[g].path.clone(),
                    extraction.variables[t].path.clone(),
                )
            })
            .collect()
    };

    let pairs = subgroup_pairs(&extraction.variables, 20, 200);
    let named = paths(&pairs);
    assert_eq!(named.len(), 7);
    assert!(named.iter().all(|(g, t)| g != t));
    assert_eq!(
        named[0],
        ("effects.em_interference".to_string(), "effects.physiological".to_string())
    );
    assert_eq!(named[6], ("shape".to_string(), "witnesses".to_string()));

    // a cardinality ceiling of 3 drops the four-shape grouping
    let narrow = paths(&subgroup_pairs(&extraction.variables, 3, 200));
    assert!(narrow.iter().all(|(g, _)| g != "shape"));

    assert_eq!(subgroup_pairs(&extraction.variables, 20, 3), pairs[..3].to_vec());
}

//! Variable discovery and census over realistic record sets.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use deep_miner::analyzers::{
    census_entry, compute_cross_tab, normalize_boolean, VariableExtractor, VariableValue,
};
use deep_miner::prelude::*;
use serde_json::json;

#[test]
fn test_nested_payload_types() {
    let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&ufo_sightings(120));

    assert_eq!(extraction.total_records, 120);
    assert_eq!(extraction.count_by_type(VariableType::Categorical), 1);
    assert_eq!(extraction.count_by_type(VariableType::Boolean), 2);
    assert_eq!(extraction.count_by_type(VariableType::Continuous), 1);
    assert_eq!(extraction.count_by_type(VariableType::Temporal), 1);
    assert_eq!(extraction.free_text_paths, vec!["notes".to_string()]);
    assert!(extraction.sparse_paths.is_empty());

    let physiological = extraction.variable("effects.physiological").unwrap();
    assert_eq!(physiological.name, "physiological");
    assert_eq!(physiological.var_type, VariableType::Boolean);
    assert_eq!(physiological.values[0], Some(VariableValue::Bool(true)));
    assert_eq!(physiological.values[1], Some(VariableValue::Bool(false)));

    for variable in &extraction.variables {
        assert_eq!(variable.values.len(), 120);
    }
}

#[test]
fn test_mixed_case_booleans_normalize() {
    assert_eq!(normalize_boolean(&json!("yes")), Some(true));
    assert_eq!(normalize_boolean(&json!("YES")), Some(true));
    assert_eq!(normalize_boolean(&json!("no")), Some(false));
    assert_eq!(normalize_boolean(&json!("unknown")), None);

    let config = MinerConfig::default().with_min_non_null(1);
    let extraction = VariableExtractor::new(&config).extract(&scenario_d());
    let contact = extraction.variable("contact").unwrap();
    assert_eq!(contact.var_type, VariableType::Boolean);
    assert_eq!(
        contact.values,
        vec![
            Some(VariableValue::Bool(true)),
            Some(VariableValue::Bool(false)),
            Some(VariableValue::Bool(true)),
            None,
        ]
    );
    assert_eq!(contact.non_null_count(), 3);
}

#[test]
fn test_mixed_case_booleans_at_default_config() {
    let records = scenario_d_cycled(40);
    let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&records);

    let contact = extraction.variable("contact").unwrap();
    assert_eq!(contact.var_type, VariableType::Boolean);
    assert_eq!(contact.non_null_count(), 30);
    assert_eq!(contact.values[2], Some(VariableValue::Bool(true)));
    assert_eq!(contact.values[3], None);

    let entry = census_entry(contact);
    assert_eq!(entry.null_count, 10);
    let distribution = entry.value_distribution.unwrap();
    assert_eq!(distribution.len(), 2);
    assert_eq!(distribution["true"], 20);
    assert_eq!(distribution["false"], 10);

    let relation = extraction.variable("relation").unwrap();
    let cross_tab = compute_cross_tab(contact, relation, 0.05).unwrap();
    assert_eq!(cross_tab.total_n, 40);
    assert_eq!(cross_tab.valid_n, 30);
    assert_eq!(
        cross_tab.table.keys().cloned().collect::<Vec<_>>(),
        vec!["false".to_string(), "true".to_string()]
    );
    assert!(!cross_tab.is_significant);
}

#[test]
fn test_too_few_observations_is_sparse() {
    let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&scenario_d());
    assert!(extraction.variables.is_empty());
    assert_eq!(extraction.sparse_paths, vec!["contact".to_string()]);
}

#[test]
fn test_null_like_values_are_missing() {
    let payloads = (0..20)
        .map(|i| match i % 4 {
            0 => json!({"light": null}),
            1 => json!({"light": ""}),
            2 => json!({"light": "white"}),
            _ => json!({"light": "red"}),
        })
        .collect();
    let records = records_from(Domain::Ufo, payloads);
    let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&records);

    let light = extraction.variable("light").unwrap();
    assert_eq!(light.var_type, VariableType::Categorical);
    let entry = census_entry(light);
    assert_eq!(entry.total, 20);
    assert_eq!(entry.non_null, 10);
    assert!((entry.missing_rate - 0.5).abs() < 1e-12);
    assert_eq!(entry.distinct_count, 2);
}

#[test]
fn test_variable_cap_keeps_densest_in_discovery_order() {
    let payloads = (0..30)
        .map(|i| {
            let label = if i % 2 == 0 { "a" } else { "b" };
            let mut data = json!({"common": label});
            if i < 20 {
                data["medium"] = json!(label);
            }
            if i < 10 {
                data["rare"] = json!(label);
            }
            data
        })
        .collect();
    let records = records_from(Domain::RemoteViewing, payloads);

    let config = MinerConfig::default().with_max_variables(2);
    let extraction = VariableExtractor::new(&config).extract(&records);
    let paths: Vec<&str> = extraction.variables.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, vec!["common", "medium"]);
    assert_eq!(extraction.dropped_by_cap, 1);
}

#[test]
fn test_census_of_continuous_and_temporal_fields() {
    let extraction = VariableExtractor::new(&MinerConfig::default()).extract(&ufo_sightings(48));

    let witnesses = census_entry(extraction.variable("witnesses").unwrap());
    let stats = witnesses.stats.unwrap();
    assert_eq!(stats.count, 48);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 6.0);
    assert!((stats.mean - 3.5).abs() < 1e-12);

    let dates = census_entry(extraction.variable("sighting_date").unwrap());
    assert_eq!(dates.earliest, Some(Utc.with_ymd_and_hms(2019, 1, 15, 0, 0, 0).unwrap()));
    assert!(dates.latest.unwrap() > dates.earliest.unwrap());
    assert!(dates.value_distribution.is_none());
}

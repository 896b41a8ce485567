//! Variable discovery over a record set.
//!
//! Every record payload is flattened, observations are grouped by path in
//! first-seen order, and each path is typed by the
//! [`TypeInferenceEngine`]. Typed paths become [`ExtractedVariable`]s whose
//! `values` line up with the input records by index.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::inference::{normalize_value, InferenceConfig, InferredType, TypeInferenceEngine};
use super::types::{ExtractedVariable, Extraction};
use crate::config::MinerConfig;
use crate::record::{flatten, leaf_name, Record};

/// Observations of one path: (record index, raw value)
struct ObservedPath<'a> {
    path: String,
    cells: Vec<(usize, &'a Value)>,
}

/// Builds the variable census for a record set.
#[derive(Debug, Clone)]
pub struct VariableExtractor {
    engine: TypeInferenceEngine,
    max_variables: usize,
}

impl VariableExtractor {
    pub fn new(config: &MinerConfig) -> Self {
        Self {
            engine: TypeInferenceEngine::with_config(InferenceConfig::from(config)),
            max_variables: config.max_variables,
        }
    }

    /// Discovers, types and aligns every variable in `records`.
    ///
    /// When more than `max_variables` paths qualify, the ones with the most
    /// non-null observations are kept (ties go to the earlier path) and
    /// returned in discovery order.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn extract(&self, records: &[Record]) -> Extraction {
        let observed = observe_paths(records);
        let total_records = records.len();

        let mut extraction = Extraction {
            total_records,
            ..Extraction::default()
        };
        let mut typed = Vec::new();

        for ObservedPath { path, cells } in observed {
            let inference = self.engine.infer_values(cells.iter().map(|(_, v)| *v));
            let var_type = match inference.inferred_type.variable_type() {
                Some(var_type) => var_type,
                None => {
                    match inference.inferred_type {
                        InferredType::FreeText { cardinality } => {
                            debug!(path = %path, cardinality, "Excluding free-text path");
                            extraction.free_text_paths.push(path);
                        }
                        _ => extraction.sparse_paths.push(path),
                    }
                    continue;
                }
            };

            let mut values = vec![None; total_records];
            for (index, raw) in cells {
                values[index] = normalize_value(raw, var_type);
            }
            typed.push(ExtractedVariable {
                name: leaf_name(&path).to_string(),
                path,
                var_type,
                values,
            });
        }

        if typed.len() > self.max_variables {
            extraction.dropped_by_cap = typed.len() - self.max_variables;
            typed = apply_variable_cap(typed, self.max_variables);
        }
        extraction.variables = typed;

        info!(
            variables = extraction.variables.len(),
            free_text = extraction.free_text_paths.len(),
            sparse = extraction.sparse_paths.len(),
            dropped_by_cap = extraction.dropped_by_cap,
            "Completed variable extraction"
        );
        extraction
    }
}

/// Groups flattened observations by path, in first-seen order.
fn observe_paths(records: &[Record]) -> Vec<ObservedPath<'_>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut observed: Vec<ObservedPath<'_>> = Vec::new();

    for (row, record) in records.iter().enumerate() {
        for (path, value) in flatten(&record.data) {
            let slot = match index.get(&path) {
                Some(&slot) => slot,
                None => {
                    let slot = observed.len();
                    index.insert(path.clone(), slot);
                    observed.push(ObservedPath {
                        path,
                        cells: Vec::new(),
                    });
                    slot
                }
            };
            observed[slot].cells.push((row, value));
        }
    }
    observed
}

fn apply_variable_cap(variables: Vec<ExtractedVariable>, cap: usize) -> Vec<ExtractedVariable> {
    let mut ranked: Vec<(usize, usize, ExtractedVariable)> = variables
        .into_iter()
        .enumerate()
        .map(|(order, var)| (order, var.non_null_count(), var))
        .collect();
    // stable: equal counts keep discovery order
    ranked.sort_by_key(|(_, non_null, _)| Reverse(*non_null));
    ranked.truncate(cap);
    ranked.sort_by_key(|(order, _, _)| *order);
    ranked.into_iter().map(|(_, _, var)| var).collect()
}

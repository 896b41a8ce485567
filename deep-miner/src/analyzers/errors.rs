//! "No finding" outcomes for the analyzers.
//!
//! Sparse real-world data makes an empty result the common case, so every
//! analyzer returns a [`Finding`] and names the reason when it has nothing
//! to report. None of these reasons is an error.

use thiserror::Error;

use super::types::VariableType;

/// Result of evaluating one variable, pair or grouping.
pub type Finding<T> = Result<T, InsufficientData>;

/// Why an analyzer produced no result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsufficientData {
    /// Fewer records with both values present than the test needs.
    #[error("only {valid_n} valid records, {required} required")]
    TooFewValidRecords { valid_n: usize, required: usize },

    /// A variable shows fewer than two categories among the valid records.
    #[error("'{variable}' has {observed} observed categories, at least 2 required")]
    TooFewCategories { variable: String, observed: usize },

    /// The contingency table has an empty margin.
    #[error("contingency table is degenerate")]
    DegenerateTable,

    /// Too few subgroups reached the minimum size.
    #[error("{qualifying} subgroups reached n >= {min_size}, at least 2 required")]
    TooFewGroups { qualifying: usize, min_size: usize },

    /// Too few time buckets reached the minimum size.
    #[error("{qualifying} periods reached n >= {min_size}, at least {required} required")]
    TooFewBuckets {
        qualifying: usize,
        min_size: usize,
        required: usize,
    },

    /// The variable's type cannot play the requested role.
    #[error("'{variable}' is {var_type}, which this analysis does not accept")]
    UnsupportedType {
        variable: String,
        var_type: VariableType,
    },

    /// No usable date field exists in the record set.
    #[error("no date field found")]
    NoDateField,
}

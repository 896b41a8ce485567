//! Statistics primitives used by the analyzers.
//!
//! Everything in this module is a pure function over plain numbers or count
//! tables. Functions that cannot produce a meaningful answer for their input
//! (empty data, degenerate tables) return `None` instead of an error.
//!
//! - [`chi_square`]: Pearson's chi-square test of independence, Cramér's V
//!   and Cohen's effect size bands
//! - [`descriptive`]: min/max/mean/median/std-dev/quartiles and a coarse
//!   distribution shape
//! - [`proportion`]: Wilson score interval for a binomial proportion
//! - [`trend`]: linear trend and stability over an ordered series
//! - [`format`]: p-value and percentage presentation helpers
//! - [`distribution`]: gamma-function helpers behind the chi-square p-value

pub mod chi_square;
pub mod descriptive;
pub mod distribution;
pub mod format;
pub mod proportion;
pub mod trend;

pub use chi_square::{
    categorize_effect_size, chi_square_test, ChiSquareResult, ContingencyTable, EffectSize,
};
pub use descriptive::{
    calculate_descriptive_stats, determine_distribution_shape, DescriptiveStats,
    DistributionShape,
};
pub use format::{format_p_value, format_percent, significance_stars};
pub use proportion::{proportion_ci, ProportionInterval};
pub use trend::{determine_trend, TrendAnalysis, TrendDirection};

//! Descriptive statistics and a coarse distribution-shape classifier.

use serde::{Deserialize, Serialize};

/// Summary of a numeric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of values summarized
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Midpoint of the sorted sample; average of the two middle values for even counts
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single value
    pub std_dev: f64,
    /// 25th percentile (linear interpolation)
    pub q1: f64,
    /// 75th percentile (linear interpolation)
    pub q3: f64,
}

/// Coarse shape label for a numeric sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    Normal,
    SkewedLeft,
    SkewedRight,
    Bimodal,
    Uniform,
}

impl DistributionShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionShape::Normal => "normal",
            DistributionShape::SkewedLeft => "skewed_left",
            DistributionShape::SkewedRight => "skewed_right",
            DistributionShape::Bimodal => "bimodal",
            DistributionShape::Uniform => "uniform",
        }
    }
}

const SKEWNESS_THRESHOLD: f64 = 0.5;
const BIMODAL_KURTOSIS: f64 = -1.5;
const UNIFORM_KURTOSIS: f64 = -0.9;

/// Computes descriptive statistics, ignoring non-finite values.
///
/// Returns `None` when no finite value remains.
///
/// # Examples
///
/// ```
/// use deep_miner::stats::calculate_descriptive_stats;
///
/// let stats = calculate_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]).unwrap();
/// assert_eq!(stats.median, 2.5);
/// assert_eq!(stats.min, 1.0);
/// assert!(calculate_descriptive_stats(&[]).is_none());
/// ```
pub fn calculate_descriptive_stats(values: &[f64]) -> Option<DescriptiveStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let n = count as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std_dev = if count > 1 {
        let sum_sq: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    Some(DescriptiveStats {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        mean,
        median: percentile_sorted(&sorted, 0.5),
        std_dev,
        q1: percentile_sorted(&sorted, 0.25),
        q3: percentile_sorted(&sorted, 0.75),
    })
}

/// Linear-interpolation percentile of a sorted, non-empty slice.
///
/// `fraction` is in [0, 1].
pub fn percentile_sorted(sorted: &[f64], fraction: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    }
}

/// Classifies the shape of a sample from its third and fourth moments.
///
/// Strong skew wins first. Symmetric samples with very light tails are
/// bimodal (excess kurtosis near -2) or uniform (near -1.2). Fewer than four
/// values or zero variance are reported as `Normal`. This is a heuristic,
/// not a normality test.
pub fn determine_distribution_shape(values: &[f64]) -> DistributionShape {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 4 {
        return DistributionShape::Normal;
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let (m2, m3, m4) = finite.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        (m2 + d * d, m3 + d.powi(3), m4 + d.powi(4))
    });
    let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return DistributionShape::Normal;
    }

    let skewness = m3 / m2.powf(1.5);
    let excess_kurtosis = m4 / (m2 * m2) - 3.0;

    if skewness > SKEWNESS_THRESHOLD {
        DistributionShape::SkewedRight
    } else if skewness < -SKEWNESS_THRESHOLD {
        DistributionShape::SkewedLeft
    } else if excess_kurtosis <= BIMODAL_KURTOSIS {
        DistributionShape::Bimodal
    } else if excess_kurtosis <= UNIFORM_KURTOSIS {
        DistributionShape::Uniform
    } else {
        DistributionShape::Normal
    }
}

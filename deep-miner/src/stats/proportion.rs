//! Confidence intervals for binomial proportions.

use serde::{Deserialize, Serialize};

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// A proportion with its Wilson 95% interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProportionInterval {
    pub proportion: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Wilson score interval for `successes` out of `n`.
///
/// The bounds always satisfy `0 <= lower <= proportion <= upper <= 1`.
/// Returns `None` when `n` is zero or `successes > n`.
pub fn proportion_ci(successes: u64, n: u64) -> Option<ProportionInterval> {
    if n == 0 || successes > n {
        return None;
    }

    let n_f = n as f64;
    let p = successes as f64 / n_f;
    let z2 = Z_95 * Z_95;

    let denominator = 1.0 + z2 / n_f;
    let centre = (p + z2 / (2.0 * n_f)) / denominator;
    let half_width = Z_95 * (p * (1.0 - p) / n_f + z2 / (4.0 * n_f * n_f)).sqrt() / denominator;

    Some(ProportionInterval {
        proportion: p,
        lower: (centre - half_width).clamp(0.0, p),
        upper: (centre + half_width).clamp(p, 1.0),
    })
}

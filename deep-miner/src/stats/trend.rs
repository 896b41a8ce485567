//! Trend and stability of an ordered series.

use serde::{Deserialize, Serialize};

/// Relative change across the observed span below which a series is stable.
pub const STABLE_CHANGE_THRESHOLD: f64 = 0.1;

/// Residual coefficient of variation above which a series is noisy.
pub const VOLATILITY_THRESHOLD: f64 = 0.2;

/// Direction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Volatile => "volatile",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: TrendDirection,
    /// Least-squares slope per unit of period
    pub slope: f64,
    /// 1 minus the residual variance around the fit relative to the squared mean, in [0, 1]
    pub stability_score: f64,
}

/// Classifies a `(period, value)` series sorted by period.
///
/// A least-squares line is fitted. The change it predicts across the span,
/// relative to the series mean, is compared with the residual noise: noise
/// above [`VOLATILITY_THRESHOLD`] that also exceeds the change makes the
/// series volatile; otherwise a change beyond [`STABLE_CHANGE_THRESHOLD`]
/// makes it increasing or decreasing. Returns `None` for fewer than two points.
pub fn determine_trend(points: &[(f64, f64)]) -> Option<TrendAnalysis> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let residual_variance = points
        .iter()
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum::<f64>()
        / n;

    let scale = if mean_y.abs() > f64::EPSILON {
        mean_y.abs()
    } else {
        1.0
    };

    let span = points[points.len() - 1].0 - points[0].0;
    let relative_change = slope * span / scale;
    let residual_cv = residual_variance.sqrt() / scale;
    let stability_score = 1.0 - (residual_variance / (scale * scale)).min(1.0);

    let trend = if residual_cv > VOLATILITY_THRESHOLD && residual_cv > relative_change.abs() {
        TrendDirection::Volatile
    } else if relative_change > STABLE_CHANGE_THRESHOLD {
        TrendDirection::Increasing
    } else if relative_change < -STABLE_CHANGE_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Some(TrendAnalysis {
        trend,
        slope,
        stability_score,
    })
}

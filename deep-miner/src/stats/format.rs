//! Presentation helpers for statistics.

/// Formats a p-value for display: `"< 0.001"` below 0.001, else three decimals.
pub fn format_p_value(p_value: f64) -> String {
    if p_value < 0.001 {
        "< 0.001".to_string()
    } else {
        format!("{p_value:.3}")
    }
}

/// Conventional significance stars.
pub fn significance_stars(p_value: f64) -> &'static str {
    if p_value < 0.001 {
        "***"
    } else if p_value < 0.01 {
        "**"
    } else if p_value < 0.05 {
        "*"
    } else {
        ""
    }
}

/// Formats a proportion in [0, 1] as a percentage with one decimal.
pub fn format_percent(proportion: f64) -> String {
    format!("{:.1}%", proportion * 100.0)
}

//! Rendering of session reports.
//!
//! Three formatters share one trait: JSON for programmatic consumers,
//! human-readable text for terminals and logs, and Markdown for research
//! notes.
//!
//! # Examples
//!
//! ```rust,ignore
//! use deep_miner::formatters::{FormatterConfig, MarkdownFormatter, ReportFormatter};
//!
//! let report = miner.run().await?;
//! let markdown = MarkdownFormatter::with_config(FormatterConfig::minimal()).format(&report)?;
//! ```

use std::fmt::Write;

use serde_json::json;

use crate::error::{MinerError, Result};
use crate::session::{SessionReport, SessionStatus};
use crate::stats::{format_p_value, format_percent};

/// Configuration options for formatting session reports.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterConfig {
    /// Include per-variable census entries
    pub include_census: bool,
    /// Include subgroup findings
    pub include_subgroups: bool,
    /// Include temporal stability findings
    pub include_temporal: bool,
    /// Maximum findings listed per section (`None` for all)
    pub max_findings: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_census: false,
            include_subgroups: true,
            include_temporal: true,
            max_findings: Some(10),
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Summary and top associations only.
    pub fn minimal() -> Self {
        Self {
            include_census: false,
            include_subgroups: false,
            include_temporal: false,
            max_findings: Some(5),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Every section, every finding.
    pub fn detailed() -> Self {
        Self {
            include_census: true,
            include_subgroups: true,
            include_temporal: true,
            max_findings: None,
            use_colors: true,
            include_timestamps: true,
        }
    }

    pub fn with_census(mut self, include: bool) -> Self {
        self.include_census = include;
        self
    }

    pub fn with_max_findings(mut self, max: Option<usize>) -> Self {
        self.max_findings = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn limit(&self) -> usize {
        self.max_findings.unwrap_or(usize::MAX)
    }
}

/// Converts a session report into a string representation.
pub trait ReportFormatter {
    fn format(&self, report: &SessionReport) -> Result<String>;

    /// Formats with an explicit configuration.
    fn format_with_config(
        &self,
        report: &SessionReport,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

fn render_error(err: std::fmt::Error) -> MinerError {
    MinerError::Internal(format!("Failed to render report: {err}"))
}

/// Structured JSON output.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &SessionReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &SessionReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let limit = config.limit();
        let significant: Vec<_> = report.significant_cross_tabs().into_iter().take(limit).collect();

        let mut value = json!({
            "session": report.session,
            "phases": report.phases,
            "phase_errors": report.phase_errors,
            "significant_associations": significant,
        });
        if config.include_census {
            value["census"] = serde_json::to_value(&report.findings.census)?;
        }
        if config.include_subgroups {
            let subgroups: Vec<_> = report.findings.subgroups.iter().take(limit).collect();
            value["subgroups"] = serde_json::to_value(subgroups)?;
        }
        if config.include_temporal {
            let temporal: Vec<_> = report.findings.temporal.iter().take(limit).collect();
            value["temporal"] = serde_json::to_value(temporal)?;
            value["date_field"] = json!(report.findings.date_field);
        }

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered
            .map_err(|e| MinerError::Internal(format!("Failed to serialize report to JSON: {e}")))
    }
}

/// Console output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        &self,
        report: &SessionReport,
        config: &FormatterConfig,
        out: &mut String,
    ) -> std::fmt::Result {
        let session = &report.session;
        let stats = &session.stats;
        let limit = config.limit();

        writeln!(out)?;
        let (icon, label, color) = match session.status {
            SessionStatus::Completed => ("✅", "Deep Miner session completed", "32"),
            SessionStatus::Failed => ("❌", "Deep Miner session failed", "31"),
            _ => ("⏳", "Deep Miner session in progress", "33"),
        };
        if config.use_colors {
            writeln!(out, "{icon} \x1b[{color}m{label}\x1b[0m")?;
        } else {
            writeln!(out, "{icon} {label}")?;
        }
        writeln!(out)?;
        writeln!(out, "Session: {}", session.id)?;
        writeln!(out, "Domain: {}", session.domain.label())?;
        if config.include_timestamps {
            writeln!(out, "Started: {}", session.started_at)?;
            if let Some(completed_at) = session.completed_at {
                writeln!(out, "Completed: {completed_at}")?;
            }
        }

        writeln!(out)?;
        writeln!(out, "📊 Summary Statistics:")?;
        writeln!(out, "   Records analyzed: {}", stats.records_analyzed)?;
        writeln!(out, "   Variables found: {}", stats.variables_found)?;
        writeln!(
            out,
            "   Cross-tabulations: {} ({} significant)",
            stats.cross_tabs_computed, stats.significant_associations
        )?;
        writeln!(out, "   Subgroup analyses: {}", stats.subgroups_analyzed)?;
        writeln!(out, "   Temporal analyses: {}", stats.temporal_analyses)?;
        if stats.write_failures > 0 {
            writeln!(out, "   Write failures: {}", stats.write_failures)?;
        }
        if session.truncated {
            writeln!(out, "   ⚠️  Stopped early: time budget exhausted")?;
        }

        let significant = report.significant_cross_tabs();
        if !significant.is_empty() {
            writeln!(out)?;
            writeln!(out, "🔗 Significant Associations:")?;
            for cross_tab in significant.iter().take(limit) {
                writeln!(out, "   • {}", cross_tab.interpretation)?;
            }
            if significant.len() > limit {
                writeln!(out, "   ... and {} more", significant.len() - limit)?;
            }
        }

        if config.include_subgroups && !report.findings.subgroups.is_empty() {
            writeln!(out)?;
            writeln!(out, "👥 Subgroup Findings:")?;
            for analysis in report.findings.subgroups.iter().take(limit) {
                for finding in &analysis.notable_findings {
                    writeln!(out, "   • {finding}")?;
                }
            }
        }

        if config.include_temporal && !report.findings.temporal.is_empty() {
            writeln!(out)?;
            writeln!(out, "📈 Temporal Stability:")?;
            for analysis in report.findings.temporal.iter().take(limit) {
                writeln!(out, "   • {}", analysis.interpretation)?;
            }
        }

        if config.include_census && !report.findings.census.is_empty() {
            writeln!(out)?;
            writeln!(out, "🗂  Variable Census:")?;
            for entry in report.findings.census.iter().take(limit) {
                writeln!(
                    out,
                    "   {} ({}): {} non-null, {} missing",
                    entry.path,
                    entry.var_type,
                    entry.non_null,
                    format_percent(entry.missing_rate)
                )?;
            }
        }

        if !report.phase_errors.is_empty() {
            writeln!(out)?;
            writeln!(out, "❗ Phase Errors:")?;
            for error in &report.phase_errors {
                writeln!(out, "   {}: {}", error.phase, error.message)?;
            }
        }

        if let Some(ref summary) = session.summary {
            writeln!(out)?;
            writeln!(out, "{summary}")?;
        }
        Ok(())
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &SessionReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &SessionReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(report, config, &mut output).map_err(render_error)?;
        Ok(output)
    }
}

/// Markdown output for research notes.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the heading level (1-6) of the top heading.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn render(
        &self,
        report: &SessionReport,
        config: &FormatterConfig,
        out: &mut String,
    ) -> std::fmt::Result {
        let session = &report.session;
        let stats = &session.stats;
        let limit = config.limit();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(out, "{h} Deep Miner Report: {}", session.domain.label())?;
        writeln!(out)?;
        writeln!(out, "**Session:** `{}` ({})", session.id, session.status)?;
        if config.include_timestamps {
            writeln!(out, "**Started:** {}", session.started_at)?;
        }
        if let Some(ref summary) = session.summary {
            writeln!(out)?;
            writeln!(out, "{summary}")?;
        }

        writeln!(out)?;
        writeln!(out, "{h}# Summary")?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Records | {} |", stats.records_analyzed)?;
        writeln!(out, "| Variables | {} |", stats.variables_found)?;
        writeln!(out, "| Cross-tabulations | {} |", stats.cross_tabs_computed)?;
        writeln!(out, "| Significant | {} |", stats.significant_associations)?;
        writeln!(out, "| Subgroup analyses | {} |", stats.subgroups_analyzed)?;
        writeln!(out, "| Temporal analyses | {} |", stats.temporal_analyses)?;

        let significant = report.significant_cross_tabs();
        if !significant.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Significant Associations")?;
            writeln!(out)?;
            writeln!(out, "| Variables | χ² | df | p | Cramér's V | Effect |")?;
            writeln!(out, "|-----------|----|----|---|------------|--------|")?;
            for c in significant.iter().take(limit) {
                writeln!(
                    out,
                    "| {} × {} | {:.2} | {} | {} | {:.3} | {} |",
                    c.variable_a,
                    c.variable_b,
                    c.chi_square,
                    c.degrees_of_freedom,
                    format_p_value(c.p_value),
                    c.cramers_v,
                    c.effect_size
                )?;
            }
        }

        if config.include_subgroups && !report.findings.subgroups.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Subgroups")?;
            writeln!(out)?;
            for analysis in report.findings.subgroups.iter().take(limit) {
                for finding in &analysis.notable_findings {
                    writeln!(out, "- {finding}")?;
                }
            }
        }

        if config.include_temporal && !report.findings.temporal.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Temporal Stability")?;
            writeln!(out)?;
            writeln!(out, "| Variable | Trend | Slope | Stability |")?;
            writeln!(out, "|----------|-------|-------|-----------|")?;
            for t in report.findings.temporal.iter().take(limit) {
                writeln!(
                    out,
                    "| {} | {} | {:+.4} | {:.2} |",
                    t.variable, t.trend, t.slope, t.stability_score
                )?;
            }
        }

        if config.include_census && !report.findings.census.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Variable Census")?;
            writeln!(out)?;
            writeln!(out, "| Path | Type | Non-null | Missing |")?;
            writeln!(out, "|------|------|----------|---------|")?;
            for entry in report.findings.census.iter().take(limit) {
                writeln!(
                    out,
                    "| `{}` | {} | {} | {} |",
                    entry.path,
                    entry.var_type,
                    entry.non_null,
                    format_percent(entry.missing_rate)
                )?;
            }
        }

        if !report.phase_errors.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Phase Errors")?;
            writeln!(out)?;
            for error in &report.phase_errors {
                writeln!(out, "- **{}**: {}", error.phase, error.message)?;
            }
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &SessionReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &SessionReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(report, config, &mut output).map_err(render_error)?;
        Ok(output)
    }
}

/// Renders a one-line digest of the strongest association, if any.
pub fn headline(report: &SessionReport) -> Option<String> {
    report.significant_cross_tabs().first().map(|c| {
        format!(
            "Strongest association: {} × {} (V = {:.3}, p {})",
            c.variable_a,
            c.variable_b,
            c.cramers_v,
            match format_p_value(c.p_value) {
                p if p.starts_with('<') => p,
                p => format!("= {p}"),
            }
        )
    })
}

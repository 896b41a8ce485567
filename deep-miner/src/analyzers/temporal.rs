//! Stability of boolean rates over time.
//!
//! Records are bucketed by the period of their date field; buckets below
//! [`MIN_BUCKET_SIZE`] are dropped and the rate series of the remaining
//! buckets is classified with [`determine_trend`].

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::{Finding, InsufficientData};
use super::inference::parse_temporal;
use super::types::{ExtractedVariable, VariableType};
use crate::config::TemporalPeriod;
use crate::record::Record;
use crate::stats::{determine_trend, format_percent, TrendDirection};

/// Date fields tried in order when locating a record's date.
pub const DATE_FIELD_CANDIDATES: [&str; 9] = [
    "date_time",
    "event_date",
    "sighting_date",
    "experience_date",
    "session_date",
    "observation_date",
    "date",
    "timestamp",
    "created_at",
];

/// Minimum records in a period for it to count.
pub const MIN_BUCKET_SIZE: usize = 10;

/// Minimum qualifying periods for a trend.
pub const MIN_BUCKETS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    /// Label such as `2021`, `2021-Q3` or `2021-07`
    pub period: String,
    pub n: usize,
    /// Share of `true` among the bucket's valid records
    pub rate: f64,
}

/// Trend of a boolean variable's rate across periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalStabilityAnalysis {
    #[serde(rename = "variable_name")]
    pub variable: String,
    #[serde(rename = "variable_path")]
    pub path: String,
    pub date_field: String,
    pub period: TemporalPeriod,
    /// Qualifying buckets in chronological order
    pub buckets: Vec<PeriodBucket>,
    pub trend: TrendDirection,
    pub slope: f64,
    pub stability_score: f64,
    pub interpretation: String,
}

/// Picks the first of `candidates` that resolves to a parseable date in
/// any record. `created_at` always qualifies when records exist, since
/// every record carries a creation timestamp.
pub fn locate_date_field(records: &[Record], candidates: &[&str]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|field| {
            **field == "created_at"
                || records
                    .iter()
                    .any(|r| r.field(field).and_then(parse_temporal).is_some())
        })
        .map(|field| field.to_string())
}

/// Date of `record` under `field`.
///
/// `created_at` falls back to the record's creation timestamp when the
/// payload has no parseable value.
pub fn record_date(record: &Record, field: &str) -> Option<DateTime<Utc>> {
    let parsed = record.field(field).and_then(parse_temporal);
    match parsed {
        None if field == "created_at" => Some(record.created_at),
        other => other,
    }
}

/// Dates of every record under `field`, aligned by index.
pub fn record_dates(records: &[Record], field: &str) -> Vec<Option<DateTime<Utc>>> {
    records.iter().map(|r| record_date(r, field)).collect()
}

/// Boolean variables eligible for a stability check, capped at `max`.
pub fn temporal_candidates(
    variables: &[ExtractedVariable],
    date_field: &str,
    max: usize,
) -> Vec<usize> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.var_type == VariableType::Boolean && v.path != date_field)
        .map(|(i, _)| i)
        .take(max)
        .collect()
}

/// Sortable ordinal and display label of the period containing `date`.
pub fn period_key(date: DateTime<Utc>, period: TemporalPeriod) -> (i64, String) {
    let year = i64::from(date.year());
    match period {
        TemporalPeriod::Year => (year, format!("{year}")),
        TemporalPeriod::Quarter => {
            let quarter = i64::from(date.month0() / 3);
            (year * 4 + quarter, format!("{year}-Q{}", quarter + 1))
        }
        TemporalPeriod::Month => {
            let month = i64::from(date.month0());
            (year * 12 + month, format!("{year}-{:02}", month + 1))
        }
    }
}

/// Measures how stable the rate of `variable` is across periods.
pub fn compute_temporal_stability(
    variable: &ExtractedVariable,
    dates: &[Option<DateTime<Utc>>],
    date_field: &str,
    period: TemporalPeriod,
) -> Finding<TemporalStabilityAnalysis> {
    if variable.var_type != VariableType::Boolean {
        return Err(InsufficientData::UnsupportedType {
            variable: variable.name.clone(),
            var_type: variable.var_type,
        });
    }

    // ordinal -> (label, n, successes)
    let mut buckets: BTreeMap<i64, (String, usize, usize)> = BTreeMap::new();
    for (value, date) in variable.values.iter().zip(dates) {
        let (Some(flag), Some(date)) = (value.as_ref().and_then(|v| v.as_bool()), date) else {
            continue;
        };
        let (ordinal, label) = period_key(*date, period);
        let bucket = buckets.entry(ordinal).or_insert_with(|| (label, 0, 0));
        bucket.1 += 1;
        if flag {
            bucket.2 += 1;
        }
    }

    let total_buckets = buckets.len();
    let qualifying: Vec<(i64, PeriodBucket)> = buckets
        .into_iter()
        .filter(|(_, (_, n, _))| *n >= MIN_BUCKET_SIZE)
        .map(|(ordinal, (period, n, successes))| {
            (
                ordinal,
                PeriodBucket {
                    period,
                    n,
                    rate: successes as f64 / n as f64,
                },
            )
        })
        .collect();

    debug!(
        variable = %variable.path,
        buckets = total_buckets,
        qualifying = qualifying.len(),
        "Bucketed temporal series"
    );

    if qualifying.len() < MIN_BUCKETS {
        return Err(InsufficientData::TooFewBuckets {
            qualifying: qualifying.len(),
            min_size: MIN_BUCKET_SIZE,
            required: MIN_BUCKETS,
        });
    }

    let points: Vec<(f64, f64)> = qualifying
        .iter()
        .map(|(ordinal, bucket)| (*ordinal as f64, bucket.rate))
        .collect();
    let trend = determine_trend(&points).ok_or(InsufficientData::TooFewBuckets {
        qualifying: qualifying.len(),
        min_size: MIN_BUCKET_SIZE,
        required: MIN_BUCKETS,
    })?;

    let buckets: Vec<PeriodBucket> = qualifying.into_iter().map(|(_, b)| b).collect();
    let interpretation = interpret(variable, &buckets, period, trend.trend, trend.stability_score);

    Ok(TemporalStabilityAnalysis {
        variable: variable.name.clone(),
        path: variable.path.clone(),
        date_field: date_field.to_string(),
        period,
        buckets,
        trend: trend.trend,
        slope: trend.slope,
        stability_score: trend.stability_score,
        interpretation,
    })
}

fn interpret(
    variable: &ExtractedVariable,
    buckets: &[PeriodBucket],
    period: TemporalPeriod,
    trend: TrendDirection,
    stability: f64,
) -> String {
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return String::new();
    };
    format!(
        "{} rate went from {} in {} to {} in {} across {} {}s; {} (stability {:.2})",
        variable.name,
        format_percent(first.rate),
        first.period,
        format_percent(last.rate),
        last.period,
        buckets.len(),
        period.as_str(),
        trend,
        stability
    )
}

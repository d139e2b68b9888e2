//! Utility functions for the sales_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Parse a calendar date from the formats commonly found in sales exports
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive());
    }

    Err(ForecastError::InvalidInput(format!(
        "Cannot parse date: '{}'",
        raw
    )))
}

/// Consecutive calendar days following `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last_date + Duration::days(offset))
        .collect()
}

/// Number of calendar days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Earliest date present in only one of the two lists; `None` when both cover the same dates.
///
/// Order and repetition within each list are ignored.
pub fn unmatched_date(left: &[NaiveDate], right: &[NaiveDate]) -> Option<NaiveDate> {
    let left: BTreeSet<NaiveDate> = left.iter().copied().collect();
    let right: BTreeSet<NaiveDate> = right.iter().copied().collect();
    left.symmetric_difference(&right).next().copied()
}

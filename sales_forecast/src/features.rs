//! Feature engineering for the tree model
//!
//! Every date of the series gets one [`FeatureRow`]: calendar attributes,
//! five lagged values and 7-day rolling statistics. Leading cells that are
//! undefined (not enough history yet) are back-filled from the nearest later
//! defined cell, so the table is always fully populated.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use forecast_math::{lagged, rolling_mean, rolling_std};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Number of lagged-value features
pub const LAG_COUNT: usize = 5;

/// Window of the rolling statistics
pub const ROLLING_WINDOW: usize = 7;

/// Number of numeric features exposed to models
pub const FEATURE_COUNT: usize = 4 + LAG_COUNT + 2;

/// Engineered features for a single date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// Observed value on `date`
    pub value: f64,
    /// 0 = Monday … 6 = Sunday
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
    pub day_of_year: u32,
    /// Values at t-1 … t-5
    pub lags: [f64; LAG_COUNT],
    pub rolling_mean: f64,
    pub rolling_std: f64,
}

impl FeatureRow {
    /// Row for a future date: calendar from `date`, lag and rolling values copied from `template`
    pub fn carried_forward(date: NaiveDate, template: &FeatureRow) -> Self {
        let (day_of_week, month, year, day_of_year) = calendar(date);
        Self {
            date,
            value: template.value,
            day_of_week,
            month,
            year,
            day_of_year,
            lags: template.lags,
            rolling_mean: template.rolling_mean,
            rolling_std: template.rolling_std,
        }
    }

    /// Numeric model input, excluding the raw date and the target value
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        let mut features = [0.0; FEATURE_COUNT];
        features[0] = self.day_of_week as f64;
        features[1] = self.month as f64;
        features[2] = self.year as f64;
        features[3] = self.day_of_year as f64;
        features[4..4 + LAG_COUNT].copy_from_slice(&self.lags);
        features[4 + LAG_COUNT] = self.rolling_mean;
        features[5 + LAG_COUNT] = self.rolling_std;
        features
    }

    /// Column names matching [`FeatureRow::to_vector`]
    pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
        [
            "day_of_week",
            "month",
            "year",
            "day_of_year",
            "lag_1",
            "lag_2",
            "lag_3",
            "lag_4",
            "lag_5",
            "rolling_mean_7",
            "rolling_std_7",
        ]
    }
}

fn calendar(date: NaiveDate) -> (u32, u32, i32, u32) {
    (
        date.weekday().num_days_from_monday(),
        date.month(),
        date.year(),
        date.ordinal(),
    )
}

/// Feature table builder
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Sort, gap-fill and derive one feature row per date
    pub fn build(&self, series: &TimeSeriesData) -> Result<Vec<FeatureRow>> {
        if series.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Cannot build features for an empty series".to_string(),
            ));
        }

        let series = series.sorted()?.fill_gaps()?;
        let values = series.values();
        if values.len() < ROLLING_WINDOW {
            warn!(
                rows = values.len(),
                "series shorter than the rolling window; lag and rolling features degenerate"
            );
        }

        let first = values[0];
        let lag_columns: Vec<Vec<f64>> = (1..=LAG_COUNT)
            .map(|offset| backward_fill(&lagged(values, offset), first))
            .collect();
        let means = backward_fill(&rolling_mean(values, ROLLING_WINDOW)?, first);
        let stds = backward_fill(&rolling_std(values, ROLLING_WINDOW)?, 0.0);

        let rows: Vec<FeatureRow> = series
            .iter()
            .enumerate()
            .map(|(i, (date, value))| {
                let (day_of_week, month, year, day_of_year) = calendar(date);
                let mut lags = [0.0; LAG_COUNT];
                for (slot, column) in lags.iter_mut().zip(&lag_columns) {
                    *slot = column[i];
                }
                FeatureRow {
                    date,
                    value,
                    day_of_week,
                    month,
                    year,
                    day_of_year,
                    lags,
                    rolling_mean: means[i],
                    rolling_std: stds[i],
                }
            })
            .collect();

        debug!(rows = rows.len(), "built feature table");
        Ok(rows)
    }
}

/// Replace undefined leading cells with the nearest later defined cell.
///
/// A column without any defined cell is filled with `fallback`.
pub fn backward_fill(column: &[Option<f64>], fallback: f64) -> Vec<f64> {
    let mut filled = vec![fallback; column.len()];
    let mut next = None;
    for (i, cell) in column.iter().enumerate().rev() {
        if cell.is_some() {
            next = *cell;
        }
        filled[i] = next.unwrap_or(fallback);
    }
    filled
}

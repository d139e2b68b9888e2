//! Daily sales series handling and loading

use crate::error::{ForecastError, Result};
use crate::utils::parse_date;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Column names recognised as the value column, in priority order
const VALUE_COLUMN_HINTS: [&str; 6] = ["sales", "value", "revenue", "amount", "price", "quantity"];

/// One raw observation as read from a source; the value may be missing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Daily time series of (date, value) pairs
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeriesData {
    /// Create a series from parallel date and value vectors
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "Non-finite value on {}",
                dates[pos]
            )));
        }

        Ok(Self { dates, values })
    }

    /// Create a series from (date, value) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Result<Self> {
        let (dates, values) = pairs.into_iter().unzip();
        Self::new(dates, values)
    }

    /// Consecutive daily series starting at `start`
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = (0..values.len() as i64)
            .map(|offset| start + Duration::days(offset))
            .collect();
        Self::new(dates, values)
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observation dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observed values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over (date, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Latest date in the series
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }

    /// Value observed on `date`
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .iter()
            .position(|d| *d == date)
            .map(|pos| self.values[pos])
    }

    /// Sort ascending by date; duplicate dates are rejected
    pub fn sorted(&self) -> Result<Self> {
        let mut pairs: Vec<(NaiveDate, f64)> = self.iter().collect();
        pairs.sort_by_key(|(date, _)| *date);

        if let Some(window) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::InvalidInput(format!(
                "Duplicate date in series: {}",
                window[0].0
            )));
        }

        Self::from_pairs(pairs)
    }

    /// Whether dates are strictly ascending with exactly one day between neighbours
    pub fn is_regular_daily(&self) -> bool {
        self.dates
            .windows(2)
            .all(|w| w[1] - w[0] == Duration::days(1))
    }

    /// Insert missing calendar days, each taking the next observed value.
    ///
    /// Expects a sorted, duplicate-free series (see [`TimeSeriesData::sorted`]).
    pub fn fill_gaps(&self) -> Result<Self> {
        if self.dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidInput(
                "Series must be sorted by date without duplicates before gap filling".to_string(),
            ));
        }
        if self.is_regular_daily() {
            return Ok(self.clone());
        }

        let mut dates = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());
        let mut filled = 0usize;

        for (i, (date, value)) in self.iter().enumerate() {
            if i > 0 {
                let mut missing = self.dates[i - 1] + Duration::days(1);
                while missing < date {
                    dates.push(missing);
                    values.push(value);
                    missing += Duration::days(1);
                    filled += 1;
                }
            }
            dates.push(date);
            values.push(value);
        }

        if filled > 0 {
            warn!(filled, "back-filled missing calendar days");
        }

        Self::new(dates, values)
    }

    /// Get a slice of the series from start to end index
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.len());
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Invalid slice {}..{} for series of length {}",
                start,
                end,
                self.len()
            )));
        }

        Self::new(
            self.dates[start..end].to_vec(),
            self.values[start..end].to_vec(),
        )
    }

    /// Split off the trailing `window` observations: (history, tail)
    pub fn split_tail(&self, window: usize) -> Result<(Self, Self)> {
        if window >= self.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Trailing window of {} leaves no history in a series of length {}",
                window,
                self.len()
            )));
        }

        let cut = self.len() - window;
        Ok((self.slice(0, Some(cut))?, self.slice(cut, None)?))
    }

    /// Convert into a polars DataFrame with `date` and `value` columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let date_series = date_column("date", &self.dates)?;
        let value_series = Series::new("value", self.values.clone());
        Ok(DataFrame::new(vec![date_series, value_series])?)
    }
}

/// Build a polars `Date` column from chrono dates
pub(crate) fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Series> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ForecastError::InvalidInput("Invalid epoch".to_string()))?;
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}

/// Loading options and post-load cleaning for raw sales records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Drop exact duplicate (date, value) rows
    pub remove_duplicates: bool,
    /// Replace missing values with the mean of present values
    pub fill_nulls: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fill_nulls: true,
        }
    }
}

/// Turns raw records into a [`TimeSeriesData`]
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    options: CleanOptions,
}

impl Cleaner {
    /// Create a cleaner with the given options
    pub fn new(options: CleanOptions) -> Self {
        Self { options }
    }

    /// Cleaning options in use
    pub fn options(&self) -> CleanOptions {
        self.options
    }

    /// Apply duplicate removal and null filling.
    ///
    /// Records that keep a missing value (when `fill_nulls` is off) are
    /// rejected. Dates repeated with different values are left in place and
    /// surface later as an invalid-input error.
    pub fn clean(&self, records: &[SalesRecord]) -> Result<TimeSeriesData> {
        let mut seen = HashSet::new();
        let rows: Vec<SalesRecord> = records
            .iter()
            .filter(|r| !self.options.remove_duplicates || seen.insert(record_key(r)))
            .copied()
            .collect();
        let dropped = records.len() - rows.len();
        if dropped > 0 {
            debug!(dropped, "removed duplicate records");
        }

        let present: Vec<f64> = rows.iter().filter_map(|r| r.value).collect();
        let fill = if self.options.fill_nulls && present.len() < rows.len() {
            if present.is_empty() {
                return Err(ForecastError::InvalidInput(
                    "Every value in the source is missing".to_string(),
                ));
            }
            let mean = statrs::statistics::Statistics::mean(present.iter());
            warn!(
                missing = rows.len() - present.len(),
                mean, "filled missing values with column mean"
            );
            Some(mean)
        } else {
            None
        };

        let mut dates = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let value = match (row.value, fill) {
                (Some(v), _) => v,
                (None, Some(mean)) => mean,
                (None, None) => {
                    return Err(ForecastError::InvalidInput(format!(
                        "Missing value on {}",
                        row.date
                    )))
                }
            };
            dates.push(row.date);
            values.push(value);
        }

        TimeSeriesData::new(dates, values)
    }
}

fn record_key(record: &SalesRecord) -> (NaiveDate, Option<u64>) {
    (record.date, record.value.map(f64::to_bits))
}

/// Data loader for sales series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load and clean a series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesData> {
        let records = Self::records_from_csv(path)?;
        Cleaner::default().clean(&records)
    }

    /// Load and clean a series from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<TimeSeriesData> {
        let records = Self::records_from_dataframe(df)?;
        Cleaner::default().clean(&records)
    }

    /// Load several CSV sources, concatenate and clean them
    pub fn from_sources<P: AsRef<Path>>(sources: &[P], cleaner: &Cleaner) -> Result<TimeSeriesData> {
        Self::validate_sources(sources)?;

        let mut records = Vec::new();
        for source in sources {
            let mut loaded = Self::records_from_csv(source)?;
            debug!(source = %source.as_ref().display(), rows = loaded.len(), "loaded source");
            records.append(&mut loaded);
        }

        cleaner.clean(&records)
    }

    /// Check the source list is non-empty and every path exists
    pub fn validate_sources<P: AsRef<Path>>(sources: &[P]) -> Result<()> {
        if sources.is_empty() {
            return Err(ForecastError::InvalidInput(
                "No data sources provided".to_string(),
            ));
        }

        for source in sources {
            if !source.as_ref().exists() {
                return Err(ForecastError::InvalidInput(format!(
                    "Data source not found: {}",
                    source.as_ref().display()
                )));
            }
        }

        Ok(())
    }

    /// Read raw records from a CSV file
    pub fn records_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SalesRecord>> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(Some(100))
            .has_header(true)
            .finish()?;

        Self::records_from_dataframe(&df)
    }

    /// Read raw records from a DataFrame with a date column and a numeric value column
    pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<SalesRecord>> {
        let date_column = Self::detect_date_column(df)?;
        let value_column = Self::detect_value_column(df, &date_column)?;

        let dates_raw = df.column(&date_column)?.cast(&DataType::Utf8)?;
        let values_raw = df.column(&value_column)?.cast(&DataType::Float64)?;

        let dates = dates_raw.utf8()?;
        let values = values_raw.f64()?;

        dates
            .into_iter()
            .zip(values.into_iter())
            .enumerate()
            .map(|(row, (date, value))| {
                let date = date.ok_or_else(|| {
                    ForecastError::InvalidInput(format!("Missing date in row {}", row))
                })?;
                Ok(SalesRecord {
                    date: parse_date(date)?,
                    value: value.filter(|v| v.is_finite()),
                })
            })
            .collect()
    }

    /// Detect the date column in a DataFrame
    fn detect_date_column(df: &DataFrame) -> Result<String> {
        for name in df.get_column_names() {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") || lower_name == "day" || lower_name == "ds" {
                return Ok(name.to_string());
            }
        }

        // Fall back to the first temporal column
        if let Some(col) = df.get_columns().iter().find(|c| c.dtype().is_temporal()) {
            return Ok(col.name().to_string());
        }

        Err(ForecastError::InvalidInput(
            "No date column found in data".to_string(),
        ))
    }

    /// Detect the numeric value column in a DataFrame
    fn detect_value_column(df: &DataFrame, date_column: &str) -> Result<String> {
        let column_names = df.get_column_names();

        for hint in VALUE_COLUMN_HINTS {
            if let Some(name) = column_names
                .iter()
                .find(|name| **name != date_column && name.to_lowercase().contains(hint))
            {
                return Ok(name.to_string());
            }
        }

        df.get_columns()
            .iter()
            .find(|c| c.name() != date_column && c.dtype().is_numeric())
            .map(|c| c.name().to_string())
            .ok_or_else(|| ForecastError::InvalidInput("No numeric value column found in data".to_string()))
    }
}

//! Weighted blending of per-model forecasts into a forecast bundle

use crate::data::{date_column, TimeSeriesData};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, ModelKind};
use crate::utils::unmatched_date;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Ensemble weight per model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub seasonal_trend: f64,
    pub sequence: f64,
    pub boosted_tree: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            seasonal_trend: 0.4,
            sequence: 0.3,
            boosted_tree: 0.3,
        }
    }
}

impl EnsembleWeights {
    /// Create a validated weight vector
    pub fn new(seasonal_trend: f64, sequence: f64, boosted_tree: f64) -> Result<Self> {
        let weights = Self {
            seasonal_trend,
            sequence,
            boosted_tree,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Weights must be finite, non-negative and sum to 1
    pub fn validate(&self) -> Result<()> {
        for kind in ModelKind::ALL {
            let weight = self.weight(kind);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ForecastError::Config(format!(
                    "Weight for {} must be a non-negative number, got {}",
                    kind, weight
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ForecastError::Config(format!(
                "Ensemble weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }

    /// Weight of one model
    pub fn weight(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::SeasonalTrend => self.seasonal_trend,
            ModelKind::Sequence => self.sequence,
            ModelKind::BoostedTree => self.boosted_tree,
        }
    }

    pub fn sum(&self) -> f64 {
        self.seasonal_trend + self.sequence + self.boosted_tree
    }
}

/// One row of the published forecast table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BundleRow {
    pub date: NaiveDate,
    pub seasonal_trend: f64,
    pub sequence: f64,
    pub boosted_tree: f64,
    pub ensemble: f64,
}

impl BundleRow {
    /// Value of one model column
    pub fn model_value(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::SeasonalTrend => self.seasonal_trend,
            ModelKind::Sequence => self.sequence,
            ModelKind::BoostedTree => self.boosted_tree,
        }
    }
}

/// Per-model forecasts plus their weighted combination, one row per date
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBundle {
    rows: Vec<BundleRow>,
}

impl ForecastBundle {
    pub fn rows(&self) -> &[BundleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    /// Column of one model as a series
    pub fn model_series(&self, kind: ModelKind) -> Result<TimeSeriesData> {
        TimeSeriesData::new(
            self.dates(),
            self.rows.iter().map(|row| row.model_value(kind)).collect(),
        )
    }

    /// Ensemble column as a series
    pub fn ensemble_series(&self) -> Result<TimeSeriesData> {
        TimeSeriesData::new(self.dates(), self.rows.iter().map(|row| row.ensemble).collect())
    }

    /// Bundle as a polars table: `date`, one column per model, `ensemble`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![date_column("date", &self.dates())?];
        for kind in ModelKind::ALL {
            let values: Vec<f64> = self.rows.iter().map(|row| row.model_value(kind)).collect();
            columns.push(Series::new(kind.as_str(), values));
        }
        let ensemble: Vec<f64> = self.rows.iter().map(|row| row.ensemble).collect();
        columns.push(Series::new("ensemble", ensemble));

        Ok(DataFrame::new(columns)?)
    }

    /// Write the bundle as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Blend one forecast per model into a bundle.
///
/// Every model must be present exactly once and all forecasts must cover the
/// same set of dates, in any order. Rows come out in ascending date order.
pub fn combine(forecasts: &[ForecastResult], weights: &EnsembleWeights) -> Result<ForecastBundle> {
    weights.validate()?;

    let mut by_kind: [Option<&ForecastResult>; 3] = [None, None, None];
    for forecast in forecasts {
        let slot = &mut by_kind[slot_index(forecast.model())];
        if slot.is_some() {
            return Err(ForecastError::alignment(
                format!("Duplicate forecast for the {} model", forecast.model()),
                None,
            ));
        }
        *slot = Some(forecast);
    }

    let mut present = Vec::with_capacity(3);
    for (kind, forecast) in ModelKind::ALL.into_iter().zip(by_kind) {
        match forecast {
            Some(forecast) => present.push(forecast),
            None => {
                return Err(ForecastError::alignment(
                    format!("Missing forecast for the {} model", kind),
                    None,
                ))
            }
        }
    }

    let columns = present
        .iter()
        .map(|forecast| by_date(forecast))
        .collect::<Result<Vec<_>>>()?;

    let reference = present[0];
    for other in &present[1..] {
        if let Some(date) = unmatched_date(reference.dates(), other.dates()) {
            return Err(ForecastError::alignment(
                format!(
                    "{} and {} forecasts cover different dates",
                    reference.model(),
                    other.model()
                ),
                Some(date),
            ));
        }
    }

    let rows = columns[0]
        .iter()
        .map(|(date, seasonal_trend)| {
            let seasonal_trend = *seasonal_trend;
            let sequence = columns[1][date];
            let boosted_tree = columns[2][date];
            BundleRow {
                date: *date,
                seasonal_trend,
                sequence,
                boosted_tree,
                ensemble: weights.seasonal_trend * seasonal_trend
                    + weights.sequence * sequence
                    + weights.boosted_tree * boosted_tree,
            }
        })
        .collect();

    Ok(ForecastBundle { rows })
}

/// Values of one forecast keyed by date; a repeated date is an alignment error
fn by_date(forecast: &ForecastResult) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut column = BTreeMap::new();
    for (date, value) in forecast.dates().iter().zip(forecast.values()) {
        if column.insert(*date, *value).is_some() {
            return Err(ForecastError::alignment(
                format!("{} forecast repeats a date", forecast.model()),
                Some(*date),
            ));
        }
    }
    Ok(column)
}

fn slot_index(kind: ModelKind) -> usize {
    match kind {
        ModelKind::SeasonalTrend => 0,
        ModelKind::Sequence => 1,
        ModelKind::BoostedTree => 2,
    }
}

//! Metrics for evaluating forecast accuracy

use crate::data::TimeSeriesData;
use crate::ensemble::ForecastBundle;
use crate::error::{ForecastError, Result};
use crate::models::ModelKind;
use crate::utils::unmatched_date;
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAPE:    {:.4}%", self.mape)?;
        writeln!(f, "  RMSE:    {:.4}", self.rmse)?;
        writeln!(f, "  MAE:     {:.4}", self.mae)?;
        Ok(())
    }
}

/// Evaluate a forecast against actual values observed on the same dates.
///
/// Both series are matched by date, so their row order does not matter; a date
/// present in only one of them is an alignment error.
pub fn evaluate(actual: &TimeSeriesData, forecast: &TimeSeriesData) -> Result<ForecastMetrics> {
    if actual.is_empty() || forecast.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Cannot evaluate an empty series".to_string(),
        ));
    }
    if let Some(date) = unmatched_date(actual.dates(), forecast.dates()) {
        return Err(ForecastError::alignment(
            "Actual and forecast series cover different dates",
            Some(date),
        ));
    }
    let actual = actual.sorted()?;
    let forecast = forecast.sorted()?;
    if let Some((date, _)) = actual.iter().find(|(_, value)| *value == 0.0) {
        return Err(ForecastError::DivisionByZero { date });
    }

    let n = actual.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;

    for (a, f) in actual.values().iter().zip(forecast.values()) {
        let error = a - f;
        abs_sum += error.abs();
        sq_sum += error * error;
        pct_sum += (error / a).abs();
    }

    Ok(ForecastMetrics {
        mape: pct_sum / n * 100.0,
        rmse: (sq_sum / n).sqrt(),
        mae: abs_sum / n,
    })
}

/// Metrics for every model column of a bundle plus the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BundleMetrics {
    pub seasonal_trend: ForecastMetrics,
    pub sequence: ForecastMetrics,
    pub boosted_tree: ForecastMetrics,
    pub ensemble: ForecastMetrics,
}

impl BundleMetrics {
    /// Metrics of one model column
    pub fn model(&self, kind: ModelKind) -> &ForecastMetrics {
        match kind {
            ModelKind::SeasonalTrend => &self.seasonal_trend,
            ModelKind::Sequence => &self.sequence,
            ModelKind::BoostedTree => &self.boosted_tree,
        }
    }

    /// Model column with the lowest MAE
    pub fn best_model(&self) -> ModelKind {
        let mut best = ModelKind::SeasonalTrend;
        for kind in ModelKind::ALL {
            if self.model(kind).mae < self.model(best).mae {
                best = kind;
            }
        }
        best
    }
}

impl std::fmt::Display for BundleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<16}{:>12}{:>12}{:>12}", "model", "MAPE %", "RMSE", "MAE")?;
        let rows = ModelKind::ALL
            .iter()
            .map(|kind| (kind.as_str(), self.model(*kind)))
            .chain(std::iter::once(("ensemble", &self.ensemble)));
        for (name, m) in rows {
            writeln!(f, "{:<16}{:>12.4}{:>12.4}{:>12.4}", name, m.mape, m.rmse, m.mae)?;
        }
        Ok(())
    }
}

/// Evaluate every column of a bundle against the actual values
pub fn evaluate_bundle(actual: &TimeSeriesData, bundle: &ForecastBundle) -> Result<BundleMetrics> {
    Ok(BundleMetrics {
        seasonal_trend: evaluate(actual, &bundle.model_series(ModelKind::SeasonalTrend)?)?,
        sequence: evaluate(actual, &bundle.model_series(ModelKind::Sequence)?)?,
        boosted_tree: evaluate(actual, &bundle.model_series(ModelKind::BoostedTree)?)?,
        ensemble: evaluate(actual, &bundle.ensemble_series()?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> TimeSeriesData {
        TimeSeriesData::daily(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn test_known_values() {
        let actual = series(vec![100.0, 200.0]);
        let forecast = series(vec![110.0, 180.0]);
        let m = evaluate(&actual, &forecast).unwrap();

        assert_relative_eq!(m.mae, 15.0);
        assert_relative_eq!(m.rmse, (250.0f64).sqrt());
        assert_relative_eq!(m.mape, 10.0);
    }

    #[test]
    fn test_perfect_forecast() {
        let actual = series(vec![1.0, 2.0, 3.0]);
        let m = evaluate(&actual, &actual).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mape, 0.0);
    }

    #[test]
    fn test_zero_actual_names_date() {
        let actual = series(vec![5.0, 0.0]);
        let forecast = series(vec![5.0, 1.0]);
        match evaluate(&actual, &forecast) {
            Err(ForecastError::DivisionByZero { date }) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap())
            }
            other => panic!("expected DivisionByZero, got {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        let m = ForecastMetrics {
            mape: 1.5,
            rmse: 2.0,
            mae: 1.0,
        };
        assert!(m.to_string().contains("MAPE:    1.5000%"));
    }
}

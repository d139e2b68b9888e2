//! Forecasting models for daily sales series

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, FeatureRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

pub mod boosted;
pub mod seasonal;
pub mod sequence;

pub use boosted::{BoostedConfig, BoostedTreeFit, BoostedTreeModel, Objective};
pub use seasonal::{SeasonalConfig, SeasonalTrendFit, SeasonalTrendModel, SeasonalityMode};
pub use sequence::{SequenceConfig, SequenceFit, SequenceModel, SEQUENCE_WINDOW};

/// The three members of the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Piecewise-linear trend with calendar seasonality
    SeasonalTrend,
    /// Recurrent network over normalised value windows
    Sequence,
    /// Gradient-boosted regression trees over engineered features
    BoostedTree,
}

impl ModelKind {
    /// All kinds, in bundle column order
    pub const ALL: [ModelKind; 3] = [
        ModelKind::SeasonalTrend,
        ModelKind::Sequence,
        ModelKind::BoostedTree,
    ];

    /// Column / field name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::SeasonalTrend => "seasonal_trend",
            ModelKind::Sequence => "sequence",
            ModelKind::BoostedTree => "boosted_tree",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-model forecast over a list of dates
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    model: ModelKind,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(model: ModelKind, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if values.len() != dates.len() {
            return Err(ForecastError::InvalidInput(format!(
                "{} forecast has {} values for {} dates",
                model,
                values.len(),
                dates.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "{} forecast is not finite on {}",
                model, dates[pos]
            )));
        }

        Ok(Self {
            model,
            dates,
            values,
        })
    }

    /// Model that produced the forecast
    pub fn model(&self) -> ModelKind {
        self.model
    }

    /// Forecast dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.values.len()
    }
}

/// Recent observations a trained model extrapolates from
#[derive(Debug, Clone)]
pub struct ForecastContext {
    series: TimeSeriesData,
    features: Vec<FeatureRow>,
}

impl ForecastContext {
    /// Sort, gap-fill and featurise the current series
    pub fn new(current: &TimeSeriesData, builder: &FeatureBuilder) -> Result<Self> {
        let series = current.sorted()?.fill_gaps()?;
        let features = builder.build(&series)?;
        Ok(Self { series, features })
    }

    /// Regular daily series, ascending
    pub fn series(&self) -> &TimeSeriesData {
        &self.series
    }

    /// Feature rows aligned with [`ForecastContext::series`]
    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    /// Last observed date; forecasts start the day after
    pub fn last_date(&self) -> Result<NaiveDate> {
        self.series
            .last_date()
            .ok_or_else(|| ForecastError::InvalidInput("Current series is empty".to_string()))
    }
}

/// Trained model handle
pub trait TrainedForecastModel: Debug {
    /// Forecast one value per date in `dates`, extrapolating from `context`
    fn forecast(&self, context: &ForecastContext, dates: &[NaiveDate]) -> Result<ForecastResult>;

    /// Kind of the model
    fn kind(&self) -> ModelKind;
}

/// Forecast model that can be trained on a daily series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit from scratch on the regular history and its feature table
    fn train(&self, history: &TimeSeriesData, features: &[FeatureRow]) -> Result<Self::Trained>;

    /// Kind of the model
    fn kind(&self) -> ModelKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_result_length_check() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = ForecastResult::new(ModelKind::Sequence, vec![date], vec![]);
        assert!(result.is_err());

        let ok = ForecastResult::new(ModelKind::Sequence, vec![date], vec![1.0]).unwrap();
        assert_eq!(ok.horizons(), 1);
        assert_eq!(ok.model(), ModelKind::Sequence);
    }

    #[test]
    fn test_model_kind_names() {
        assert_eq!(ModelKind::BoostedTree.to_string(), "boosted_tree");
        assert_eq!(
            serde_json::to_string(&ModelKind::SeasonalTrend).unwrap(),
            "\"seasonal_trend\""
        );
    }
}

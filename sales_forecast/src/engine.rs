//! Forecast engine: trains the three models and serves blended forecasts

use crate::config::EngineConfig;
use crate::data::TimeSeriesData;
use crate::ensemble::{combine, ForecastBundle};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, FeatureRow};
use crate::metrics::{evaluate, evaluate_bundle, BundleMetrics, ForecastMetrics};
use crate::models::{
    BoostedTreeFit, BoostedTreeModel, ForecastContext, ForecastModel, SeasonalTrendFit,
    SeasonalTrendModel, SequenceFit, SequenceModel, TrainedForecastModel,
};
use crate::utils::future_dates;
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug)]
struct TrainedModels {
    seasonal: SeasonalTrendFit,
    sequence: SequenceFit,
    boosted: BoostedTreeFit,
    last_training_date: NaiveDate,
}

impl TrainedModels {
    fn all(&self) -> [&dyn TrainedForecastModel; 3] {
        [&self.seasonal, &self.sequence, &self.boosted]
    }
}

/// Result of a hold-out evaluation
#[derive(Debug, Clone)]
pub struct BacktestReport {
    /// Held-out trailing days
    pub window: usize,
    /// Rows the models were trained on
    pub training_rows: usize,
    /// Held-out actual values
    pub actual: TimeSeriesData,
    pub bundle: ForecastBundle,
    pub metrics: BundleMetrics,
}

/// Ensemble forecasting engine
#[derive(Debug)]
pub struct ForecastEngine {
    config: EngineConfig,
    builder: FeatureBuilder,
    seasonal: SeasonalTrendModel,
    sequence: SequenceModel,
    boosted: BoostedTreeModel,
    trained: Option<TrainedModels>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            builder: FeatureBuilder,
            seasonal: SeasonalTrendModel::default(),
            sequence: SequenceModel::default(),
            boosted: BoostedTreeModel::default(),
            trained: None,
        }
    }
}

impl ForecastEngine {
    /// Create an untrained engine; the configuration is validated here
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: FeatureBuilder,
            seasonal: SeasonalTrendModel::new(config.seasonal.clone())?,
            sequence: SequenceModel::new(config.sequence.clone())?,
            boosted: BoostedTreeModel::new(config.boosted.clone())?,
            config,
            trained: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Last date of the history used by the latest successful `train`
    pub fn last_training_date(&self) -> Option<NaiveDate> {
        self.trained.as_ref().map(|t| t.last_training_date)
    }

    /// Fit all three models from scratch on `series`.
    ///
    /// Any previous fit is discarded first, so a failed call leaves the
    /// engine untrained.
    pub fn train(&mut self, series: &TimeSeriesData) -> Result<()> {
        self.trained = None;
        if series.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Cannot train on an empty series".to_string(),
            ));
        }

        let history = series.sorted()?.fill_gaps()?;
        let features = self.builder.build(&history)?;
        let last_training_date = history
            .last_date()
            .ok_or_else(|| ForecastError::InvalidInput("Training series is empty".to_string()))?;
        info!(
            rows = history.len(),
            last_date = %last_training_date,
            "training forecast ensemble"
        );

        let seasonal = fit(&self.seasonal, &history, &features)?;
        let sequence = fit(&self.sequence, &history, &features)?;
        let boosted = fit(&self.boosted, &history, &features)?;

        self.trained = Some(TrainedModels {
            seasonal,
            sequence,
            boosted,
            last_training_date,
        });
        info!("forecast ensemble trained");
        Ok(())
    }

    /// Forecast `horizon` days after the last date of `current`
    pub fn forecast(&self, current: &TimeSeriesData, horizon: usize) -> Result<ForecastBundle> {
        let trained = self.trained.as_ref().ok_or(ForecastError::NotTrained)?;
        if horizon == 0 {
            return Err(ForecastError::InvalidInput(
                "Forecast horizon must be at least one day".to_string(),
            ));
        }

        let context = ForecastContext::new(current, &self.builder)?;
        let dates = future_dates(context.last_date()?, horizon);
        info!(
            horizon,
            context_rows = context.series().len(),
            first_date = %dates[0],
            "forecasting"
        );

        let forecasts = trained
            .all()
            .iter()
            .map(|model| {
                let result = model.forecast(&context, &dates)?;
                debug!(model = %model.kind(), horizon = result.horizons(), "model forecast ready");
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        combine(&forecasts, &self.config.weights)
    }

    /// Accuracy of `forecast` against `actual`
    pub fn evaluate(&self, actual: &TimeSeriesData, forecast: &TimeSeriesData) -> Result<ForecastMetrics> {
        evaluate(actual, forecast)
    }

    /// Hold out the trailing `window` days, train on the rest and score every column.
    ///
    /// The engine stays trained on the shortened history afterwards.
    pub fn backtest(&mut self, series: &TimeSeriesData, window: usize) -> Result<BacktestReport> {
        if window == 0 {
            return Err(ForecastError::InvalidInput(
                "Backtest window must be at least one day".to_string(),
            ));
        }

        let regular = series.sorted()?.fill_gaps()?;
        let (history, actual) = regular.split_tail(window)?;

        self.train(&history)?;
        let bundle = self.forecast(&history, window)?;
        let metrics = evaluate_bundle(&actual, &bundle)?;
        info!(
            window,
            ensemble_mae = metrics.ensemble.mae,
            best = %metrics.best_model(),
            "backtest finished"
        );

        Ok(BacktestReport {
            window,
            training_rows: history.len(),
            actual,
            bundle,
            metrics,
        })
    }
}

fn fit<M: ForecastModel>(
    model: &M,
    history: &TimeSeriesData,
    features: &[FeatureRow],
) -> Result<M::Trained> {
    debug!(model = %model.kind(), "fitting model");
    model
        .train(history, features)
        .map_err(|err| ForecastError::training(model.kind(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelKind, SequenceConfig};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_not_trained() {
        let engine = ForecastEngine::default();
        let series = TimeSeriesData::daily(start(), vec![1.0; 10]).unwrap();
        assert!(matches!(
            engine.forecast(&series, 3),
            Err(ForecastError::NotTrained)
        ));
    }

    #[test]
    fn test_failed_train_resets_state() {
        let mut engine = ForecastEngine::default();
        engine
            .train(&TimeSeriesData::daily(start(), vec![100.0; 10]).unwrap())
            .unwrap();
        assert!(engine.is_trained());

        let err = engine
            .train(&TimeSeriesData::daily(start(), vec![100.0; 3]).unwrap())
            .unwrap_err();
        assert_eq!(err.model(), Some(ModelKind::Sequence));
        assert!(!engine.is_trained());
    }

    #[test]
    fn test_zero_horizon() {
        let mut engine = ForecastEngine::default();
        let series = TimeSeriesData::daily(start(), vec![100.0; 10]).unwrap();
        engine.train(&series).unwrap();
        assert!(matches!(
            engine.forecast(&series, 0),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = EngineConfig {
            sequence: SequenceConfig {
                batch_size: 0,
                ..SequenceConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(matches!(
            ForecastEngine::new(config),
            Err(ForecastError::Config(_))
        ));
    }
}

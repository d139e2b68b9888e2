use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use rstest::rstest;
use sales_forecast::models::{BoostedConfig, SequenceConfig};
use sales_forecast::{
    EngineConfig, EnsembleWeights, ForecastEngine, ForecastError, ModelKind, TimeSeriesData,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// Smaller networks and forests keep the tests quick
fn fast_config() -> EngineConfig {
    EngineConfig {
        sequence: SequenceConfig {
            hidden_units: 8,
            epochs: 10,
            ..SequenceConfig::default()
        },
        boosted: BoostedConfig {
            n_estimators: 20,
            max_depth: 3,
            ..BoostedConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn weekly_sales(days: usize) -> TimeSeriesData {
    let values = (0..days)
        .map(|i| {
            let weekday = if i % 7 >= 5 { 40.0 } else { 0.0 };
            200.0 + i as f64 * 0.5 + weekday
        })
        .collect();
    TimeSeriesData::daily(start(), values).unwrap()
}

#[rstest]
#[case(30, 1)]
#[case(30, 7)]
#[case(60, 14)]
#[case(90, 30)]
fn test_forecast_covers_consecutive_days(#[case] days: usize, #[case] horizon: usize) {
    let series = weekly_sales(days);
    let mut engine = ForecastEngine::new(fast_config()).unwrap();
    engine.train(&series).unwrap();

    let bundle = engine.forecast(&series, horizon).unwrap();
    assert_eq!(bundle.len(), horizon);

    let last = *series.dates().last().unwrap();
    for (i, date) in bundle.dates().iter().enumerate() {
        assert_eq!(*date, last + Duration::days(i as i64 + 1));
    }
    assert!(bundle.rows().iter().all(|row| row.ensemble.is_finite()));
}

#[test]
fn test_constant_series_forecasts_constant() {
    let series = TimeSeriesData::daily(start(), vec![100.0; 10]).unwrap();
    let mut engine = ForecastEngine::default();
    engine.train(&series).unwrap();

    let bundle = engine.forecast(&series, 5).unwrap();
    assert_eq!(bundle.len(), 5);
    for row in bundle.rows() {
        assert_abs_diff_eq!(row.ensemble, 100.0, epsilon = 1.0);
    }
}

#[test]
fn test_forecast_before_train() {
    let engine = ForecastEngine::default();
    let series = weekly_sales(30);
    assert!(matches!(
        engine.forecast(&series, 7),
        Err(ForecastError::NotTrained)
    ));
}

#[test]
fn test_forecast_anchors_on_current_series() {
    let history = weekly_sales(40);
    let mut engine = ForecastEngine::new(fast_config()).unwrap();
    engine.train(&history).unwrap();

    // Newer observations than the training history
    let current = weekly_sales(45);
    let bundle = engine.forecast(&current, 3).unwrap();
    assert_eq!(bundle.dates()[0], start() + Duration::days(45));
    assert_eq!(engine.last_training_date(), Some(start() + Duration::days(39)));
}

#[test]
fn test_ensemble_uses_configured_weights() {
    let config = EngineConfig {
        weights: EnsembleWeights::new(1.0, 0.0, 0.0).unwrap(),
        ..fast_config()
    };
    let series = weekly_sales(35);
    let mut engine = ForecastEngine::new(config).unwrap();
    engine.train(&series).unwrap();

    let bundle = engine.forecast(&series, 4).unwrap();
    for row in bundle.rows() {
        assert_abs_diff_eq!(row.ensemble, row.seasonal_trend, epsilon = 1e-9);
    }
}

#[test]
fn test_weights_must_sum_to_one() {
    let config = EngineConfig {
        weights: EnsembleWeights {
            seasonal_trend: 0.5,
            sequence: 0.3,
            boosted_tree: 0.3,
        },
        ..EngineConfig::default()
    };
    assert!(matches!(
        ForecastEngine::new(config),
        Err(ForecastError::Config(_))
    ));
}

#[rstest]
#[case(0.1, 0.2, 0.7)]
#[case(0.4, 0.3, 0.3)]
#[case(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)]
fn test_weights_within_rounding_accepted(
    #[case] seasonal_trend: f64,
    #[case] sequence: f64,
    #[case] boosted_tree: f64,
) {
    let config = EngineConfig {
        weights: EnsembleWeights {
            seasonal_trend,
            sequence,
            boosted_tree,
        },
        ..EngineConfig::default()
    };
    assert!(ForecastEngine::new(config).is_ok());
}

#[rstest]
#[case(0.4, 0.3, 0.3 + 1e-8)]
#[case(0.4, 0.3, 0.3 - 1e-8)]
fn test_weights_off_by_more_than_rounding_rejected(
    #[case] seasonal_trend: f64,
    #[case] sequence: f64,
    #[case] boosted_tree: f64,
) {
    let config = EngineConfig {
        weights: EnsembleWeights {
            seasonal_trend,
            sequence,
            boosted_tree,
        },
        ..EngineConfig::default()
    };
    assert!(matches!(
        ForecastEngine::new(config),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn test_short_history_names_failing_model() {
    let series = TimeSeriesData::daily(start(), vec![10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
    let mut engine = ForecastEngine::default();

    let err = engine.train(&series).unwrap_err();
    assert!(matches!(err, ForecastError::Training { .. }));
    assert_eq!(err.model(), Some(ModelKind::Sequence));
}

#[test]
fn test_training_fills_calendar_gaps() {
    let mut dates: Vec<NaiveDate> = (0..30).map(|i| start() + Duration::days(i)).collect();
    dates.remove(10);
    let values = vec![50.0; dates.len()];
    let series = TimeSeriesData::new(dates, values).unwrap();

    let mut engine = ForecastEngine::new(fast_config()).unwrap();
    engine.train(&series).unwrap();
    let bundle = engine.forecast(&series, 2).unwrap();
    assert_eq!(bundle.dates()[0], start() + Duration::days(30));
}

#[test]
fn test_backtest_scores_every_column() {
    let series = weekly_sales(60);
    let mut engine = ForecastEngine::new(fast_config()).unwrap();

    let report = engine.backtest(&series, 7).unwrap();
    assert_eq!(report.window, 7);
    assert_eq!(report.training_rows, 53);
    assert_eq!(report.bundle.len(), 7);
    assert_eq!(report.actual.len(), 7);
    assert!(report.metrics.ensemble.mae.is_finite());
    assert!(report.metrics.model(ModelKind::BoostedTree).rmse >= 0.0);
    assert!(engine.is_trained());
}

#[rstest]
#[case(0)]
#[case(60)]
fn test_backtest_window_must_leave_history(#[case] window: usize) {
    let mut engine = ForecastEngine::new(fast_config()).unwrap();
    assert!(matches!(
        engine.backtest(&weekly_sales(60), window),
        Err(ForecastError::InvalidInput(_))
    ));
}

use approx::assert_relative_eq;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_forecast::metrics::evaluate_bundle;
use sales_forecast::{combine, evaluate, EnsembleWeights, ForecastError, ForecastResult, ModelKind, TimeSeriesData};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn series(values: Vec<f64>) -> TimeSeriesData {
    TimeSeriesData::daily(start(), values).unwrap()
}

#[test]
fn test_metric_values() {
    let actual = series(vec![100.0, 50.0, 200.0, 80.0]);
    let forecast = series(vec![90.0, 55.0, 200.0, 100.0]);
    let m = evaluate(&actual, &forecast).unwrap();

    // Errors: 10, -5, 0, -20
    assert_relative_eq!(m.mae, 35.0 / 4.0);
    assert_relative_eq!(m.rmse, (525.0f64 / 4.0).sqrt());
    assert_relative_eq!(m.mape, (0.1 + 0.1 + 0.0 + 0.25) / 4.0 * 100.0);
}

#[test]
fn test_evaluate_is_idempotent() {
    let actual = series(vec![12.0, 15.0, 9.0, 11.0]);
    let forecast = series(vec![10.0, 16.0, 8.5, 12.5]);

    let first = evaluate(&actual, &forecast).unwrap();
    let second = evaluate(&actual, &forecast).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(vec![0.0, 1.0, 2.0], 0)]
#[case(vec![1.0, 2.0, 0.0], 2)]
fn test_zero_actual(#[case] actual: Vec<f64>, #[case] zero_at: i64) {
    let forecast = series(vec![1.0; actual.len()]);
    match evaluate(&series(actual), &forecast) {
        Err(ForecastError::DivisionByZero { date }) => {
            assert_eq!(date, start() + chrono::Duration::days(zero_at))
        }
        other => panic!("expected DivisionByZero, got {:?}", other),
    }
}

#[rstest]
#[case(vec![1.0, 2.0, 3.0])]
#[case(vec![-5.0, 0.001, 1e6])]
fn test_nonzero_actuals_never_divide_by_zero(#[case] actual: Vec<f64>) {
    let forecast = series(vec![0.0; actual.len()]);
    assert!(evaluate(&series(actual), &forecast).is_ok());
}

#[test]
fn test_misaligned_dates() {
    let actual = series(vec![1.0, 2.0]);
    let later = TimeSeriesData::daily(start().succ_opt().unwrap(), vec![1.0, 2.0]).unwrap();
    assert!(matches!(
        evaluate(&actual, &later),
        Err(ForecastError::Alignment { .. })
    ));
}

#[test]
fn test_dates_matched_regardless_of_order() {
    let june = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
    let actual = TimeSeriesData::new(vec![june(1), june(2)], vec![10.0, 20.0]).unwrap();
    let forecast = TimeSeriesData::new(vec![june(2), june(1)], vec![20.0, 10.0]).unwrap();

    let m = evaluate(&actual, &forecast).unwrap();
    assert_eq!(m.mae, 0.0);
    assert_eq!(m.mape, 0.0);
}

#[test]
fn test_misalignment_names_unmatched_date() {
    let june = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
    let actual = TimeSeriesData::new(vec![june(2), june(1)], vec![20.0, 10.0]).unwrap();
    let forecast = TimeSeriesData::new(vec![june(2), june(3)], vec![20.0, 30.0]).unwrap();

    match evaluate(&actual, &forecast) {
        Err(ForecastError::Alignment { date, .. }) => assert_eq!(date, Some(june(1))),
        other => panic!("expected alignment error, got {:?}", other),
    }
}

#[test]
fn test_empty_input() {
    let empty = series(vec![]);
    assert!(matches!(
        evaluate(&empty, &empty),
        Err(ForecastError::InvalidInput(_))
    ));
}

#[test]
fn test_bundle_metrics() {
    let dates: Vec<NaiveDate> = series(vec![0.0; 2]).dates().to_vec();
    let results = vec![
        ForecastResult::new(ModelKind::SeasonalTrend, dates.clone(), vec![10.0, 20.0]).unwrap(),
        ForecastResult::new(ModelKind::Sequence, dates.clone(), vec![12.0, 18.0]).unwrap(),
        ForecastResult::new(ModelKind::BoostedTree, dates, vec![0.0, 0.0]).unwrap(),
    ];
    let bundle = combine(&results, &EnsembleWeights::default()).unwrap();
    let actual = series(vec![10.0, 20.0]);

    let metrics = evaluate_bundle(&actual, &bundle).unwrap();
    assert_eq!(metrics.seasonal_trend.mae, 0.0);
    assert_relative_eq!(metrics.sequence.mae, 2.0);
    assert_relative_eq!(metrics.boosted_tree.mape, 100.0);
    assert_eq!(metrics.best_model(), ModelKind::SeasonalTrend);
    assert!(metrics.to_string().contains("ensemble"));
}

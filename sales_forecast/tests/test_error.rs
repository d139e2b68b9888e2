use chrono::NaiveDate;
use forecast_math::MathError;
use sales_forecast::{ForecastError, ModelKind};
use std::error::Error;

#[test]
fn test_error_messages() {
    let invalid = ForecastError::InvalidInput("duplicate date".to_string());
    assert_eq!(invalid.to_string(), "Invalid input: duplicate date");

    let not_trained = ForecastError::NotTrained;
    assert!(not_trained.to_string().contains("not trained"));

    let config = ForecastError::Config("weights".to_string());
    assert_eq!(config.to_string(), "Configuration error: weights");
}

#[test]
fn test_alignment_carries_date() {
    let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
    match ForecastError::alignment("dates differ", Some(date)) {
        ForecastError::Alignment { message, date: Some(d) } => {
            assert_eq!(message, "dates differ");
            assert_eq!(d, date);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_training_error_chain() {
    let err = ForecastError::training(
        ModelKind::BoostedTree,
        MathError::CalculationError("singular".to_string()),
    );
    assert_eq!(err.model(), Some(ModelKind::BoostedTree));

    let source = err.source().expect("training error has a source");
    assert!(source.to_string().contains("singular"));
}

#[test]
fn test_conversions() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let math: ForecastError = MathError::InsufficientData("two points".to_string()).into();
    assert!(matches!(math, ForecastError::Math(_)));

    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(ForecastError::from(json), ForecastError::JsonError(_)));
}

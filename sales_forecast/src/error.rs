//! Error types for the sales_forecast crate

use crate::models::ModelKind;
use chrono::NaiveDate;
use forecast_math::MathError;
use thiserror::Error;

/// Custom error types for the sales_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Malformed input series: unparseable or duplicate dates, missing columns, empty data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A model failed to fit
    #[error("Training error in {model} model: {source}")]
    Training {
        model: ModelKind,
        #[source]
        source: Box<ForecastError>,
    },

    /// Forecast requested before the engine was trained
    #[error("Model not trained: call train() before forecast()")]
    NotTrained,

    /// Date sets of combined or evaluated series differ
    #[error("Alignment error: {message}")]
    Alignment {
        message: String,
        date: Option<NaiveDate>,
    },

    /// Percentage error against a zero actual value
    #[error("Division by zero: actual value is 0 on {date}")]
    DivisionByZero { date: NaiveDate },

    /// Invalid configuration option or weight vector
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from numeric routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from CSV serialisation
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialisation
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ForecastError {
    /// Wrap an underlying failure with the model that produced it
    pub fn training(model: ModelKind, source: impl Into<ForecastError>) -> Self {
        ForecastError::Training {
            model,
            source: Box::new(source.into()),
        }
    }

    /// Alignment failure, optionally naming the first offending date
    pub fn alignment(message: impl Into<String>, date: Option<NaiveDate>) -> Self {
        ForecastError::Alignment {
            message: message.into(),
            date,
        }
    }

    /// Model kind that failed, for training errors
    pub fn model(&self) -> Option<ModelKind> {
        match self {
            ForecastError::Training { model, .. } => Some(*model),
            _ => None,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

//! # Forecast Math
//!
//! Numeric building blocks for the sales forecasting engine.
//! This crate provides trailing window statistics, min/max scaling and a
//! regularised least squares solver.

use thiserror::Error;

pub mod regression;
pub mod rolling;
pub mod scaling;

pub use regression::{predict_row, ridge_least_squares};
pub use rolling::{lagged, rolling_mean, rolling_std, RollingWindow};
pub use scaling::MinMaxScaler;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

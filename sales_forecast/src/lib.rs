//! # Sales Forecast
//!
//! Ensemble forecasting of daily sales series.
//!
//! ## Features
//!
//! - Loading and cleaning of CSV / polars sales tables
//! - Feature engineering (calendar, lagged values, 7-day rolling statistics)
//! - Three independent models: seasonal/trend, LSTM sequence model and gradient-boosted trees
//! - Weighted ensemble combination into a per-date forecast bundle
//! - Accuracy evaluation (MAPE, RMSE, MAE) and hold-out backtesting
//! - Pluggable sources and sinks for scheduled forecasting runs
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_forecast::data::DataLoader;
//! use sales_forecast::{EngineConfig, ForecastEngine};
//!
//! # fn main() -> sales_forecast::error::Result<()> {
//! // Load data
//! let history = DataLoader::from_csv("sales.csv")?;
//!
//! // Train all three models
//! let mut engine = ForecastEngine::new(EngineConfig::default())?;
//! engine.train(&history)?;
//!
//! // Forecast two weeks after the last observation
//! let bundle = engine.forecast(&history, 14)?;
//! for row in bundle.rows() {
//!     println!("{} {:.2}", row.date, row.ensemble);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use crate::config::EngineConfig;
pub use crate::data::{Cleaner, DataLoader, TimeSeriesData};
pub use crate::engine::{BacktestReport, ForecastEngine};
pub use crate::ensemble::{combine, EnsembleWeights, ForecastBundle};
pub use crate::error::ForecastError;
pub use crate::features::{FeatureBuilder, FeatureRow};
pub use crate::metrics::{evaluate, ForecastMetrics};
pub use crate::models::{ForecastModel, ForecastResult, ModelKind};
pub use crate::pipeline::{BundleSink, ForecastPipeline, SeriesSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

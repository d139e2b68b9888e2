//! # BI Forecast
//!
//! Single entry point over the workspace crates: [`sales_forecast`] for the
//! forecasting engine and [`forecast_math`] for the numeric building blocks.
//!
//! ## Example
//!
//! ```no_run
//! use bi_forecast_workspace::{forecast_sources, EngineConfig};
//!
//! let bundle = forecast_sources(&["sales_2023.csv", "sales_2024.csv"], 30, EngineConfig::default())?;
//! println!("{} forecast rows", bundle.len());
//! # Ok::<(), bi_forecast_workspace::ForecastError>(())
//! ```

pub use forecast_math;
pub use sales_forecast;

pub use sales_forecast::{
    BacktestReport, EngineConfig, ForecastBundle, ForecastEngine, ForecastError, TimeSeriesData,
};

use sales_forecast::data::{Cleaner, DataLoader};
use sales_forecast::error::Result;
use std::path::Path;
use tracing::info;

/// Load, clean and concatenate `sources`, train a fresh engine and forecast `horizon` days.
pub fn forecast_sources<P: AsRef<Path>>(
    sources: &[P],
    horizon: usize,
    config: EngineConfig,
) -> Result<ForecastBundle> {
    let cleaner = Cleaner::new(config.cleaning);
    let history = DataLoader::from_sources(sources, &cleaner)?;

    let mut engine = ForecastEngine::new(config)?;
    engine.train(&history)?;
    info!(sources = sources.len(), rows = history.len(), "trained on sources");
    engine.forecast(&history, horizon)
}

/// Hold out the trailing `window` days of `sources` and score every model on them.
pub fn backtest_sources<P: AsRef<Path>>(
    sources: &[P],
    window: usize,
    config: EngineConfig,
) -> Result<BacktestReport> {
    let cleaner = Cleaner::new(config.cleaning);
    let history = DataLoader::from_sources(sources, &cleaner)?;

    let mut engine = ForecastEngine::new(config)?;
    engine.backtest(&history, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sales_forecast::models::{BoostedConfig, SequenceConfig};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn quick_config() -> EngineConfig {
        EngineConfig {
            sequence: SequenceConfig {
                hidden_units: 4,
                epochs: 3,
                ..SequenceConfig::default()
            },
            boosted: BoostedConfig {
                n_estimators: 5,
                ..BoostedConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn sales_file(days: u32) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,sales").unwrap();
        for day in 1..=days {
            writeln!(file, "2024-03-{:02},{}", day, 100 + day).unwrap();
        }
        file
    }

    #[test]
    fn test_forecast_sources() {
        let file = sales_file(28);
        let bundle = forecast_sources(&[file.path()], 5, quick_config()).unwrap();
        assert_eq!(bundle.len(), 5);
        assert_eq!(bundle.dates()[0].to_string(), "2024-03-29");
    }

    #[test]
    fn test_backtest_sources() {
        let file = sales_file(28);
        let report = backtest_sources(&[file.path()], 7, quick_config()).unwrap();
        assert_eq!(report.training_rows, 21);
        assert!(report.metrics.ensemble.mape.is_finite());
    }

    #[test]
    fn test_missing_source() {
        let result = forecast_sources(&["no/such/file.csv"], 5, quick_config());
        assert!(matches!(result, Err(ForecastError::InvalidInput(_))));
    }
}

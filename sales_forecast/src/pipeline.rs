//! Fetch → clean → train → forecast → publish
//!
//! Data sources and destinations are injected through [`SeriesSource`] and
//! [`BundleSink`]; the pipeline never builds clients for external systems.

use crate::data::{Cleaner, DataLoader, TimeSeriesData};
use crate::engine::ForecastEngine;
use crate::ensemble::ForecastBundle;
use crate::error::Result;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

/// Provider of the historical series
pub trait SeriesSource {
    /// Fetch the series, cleaned with `cleaner`
    fn fetch(&self, cleaner: &Cleaner) -> Result<TimeSeriesData>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Destination for finished forecasts
pub trait BundleSink {
    fn publish(&mut self, bundle: &ForecastBundle) -> Result<()>;
}

/// One or more CSV files concatenated in order
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: Vec<PathBuf>,
}

impl CsvSource {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl SeriesSource for CsvSource {
    fn fetch(&self, cleaner: &Cleaner) -> Result<TimeSeriesData> {
        DataLoader::from_sources(&self.paths, cleaner)
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("csv[{}]", names.join(", "))
    }
}

/// In-memory series, mostly for tests and demos
impl SeriesSource for TimeSeriesData {
    fn fetch(&self, _cleaner: &Cleaner) -> Result<TimeSeriesData> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("memory[{} rows]", self.len())
    }
}

/// Writes each published bundle to a CSV file, replacing earlier content
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl BundleSink for CsvSink {
    fn publish(&mut self, bundle: &ForecastBundle) -> Result<()> {
        let file = File::create(&self.path)?;
        bundle.write_csv(BufWriter::new(file))?;
        info!(path = %self.path.display(), rows = bundle.len(), "wrote forecast bundle");
        Ok(())
    }
}

/// Keeps every published bundle
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bundles: Vec<ForecastBundle>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundles(&self) -> &[ForecastBundle] {
        &self.bundles
    }

    pub fn latest(&self) -> Option<&ForecastBundle> {
        self.bundles.last()
    }
}

impl BundleSink for MemorySink {
    fn publish(&mut self, bundle: &ForecastBundle) -> Result<()> {
        self.bundles.push(bundle.clone());
        Ok(())
    }
}

/// Runs an engine between a source and a sink
#[derive(Debug)]
pub struct ForecastPipeline<S, K> {
    engine: ForecastEngine,
    source: S,
    sink: K,
}

impl<S: SeriesSource, K: BundleSink> ForecastPipeline<S, K> {
    pub fn new(engine: ForecastEngine, source: S, sink: K) -> Self {
        Self {
            engine,
            source,
            sink,
        }
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Retrain on the freshly fetched series and publish a `horizon`-day forecast
    pub fn run(&mut self, horizon: usize) -> Result<ForecastBundle> {
        let cleaner = Cleaner::new(self.engine.config().cleaning);
        let series = self.source.fetch(&cleaner)?;
        info!(source = %self.source.describe(), rows = series.len(), "fetched series");

        self.engine.train(&series)?;
        let bundle = self.engine.forecast(&series, horizon)?;
        self.sink.publish(&bundle)?;
        info!(horizon, "pipeline run complete");

        Ok(bundle)
    }
}

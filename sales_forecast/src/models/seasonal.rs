//! Seasonal/trend model
//!
//! Piecewise-linear trend with changepoints plus Fourier seasonality, fitted
//! by regularised least squares. Only the raw (date, value) pairs are used.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::features::FeatureRow;
use crate::models::{ForecastContext, ForecastModel, ForecastResult, ModelKind, TrainedForecastModel};
use crate::utils::days_between;
use chrono::{Datelike, NaiveDate};
use forecast_math::{predict_row, ridge_least_squares, MathError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Assumed observation noise on the scaled series; converts prior scales into penalties
const NOISE_SCALE: f64 = 0.1;

/// Shortest history (days) that enables weekly seasonality
const WEEKLY_MIN_SPAN: i64 = 14;

/// Shortest history (days) that enables yearly seasonality
const YEARLY_MIN_SPAN: i64 = 730;

/// How seasonality combines with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Seasonal/trend model options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    /// Trend flexibility; larger values allow bigger slope changes
    pub changepoint_prior_scale: f64,
    /// Seasonality strength; larger values allow larger seasonal swings
    pub seasonality_prior_scale: f64,
    pub seasonality_mode: SeasonalityMode,
    /// Upper bound on potential changepoints
    pub n_changepoints: usize,
    /// Share of the history (from the start) where changepoints may sit
    pub changepoint_range: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            seasonality_mode: SeasonalityMode::Additive,
            n_changepoints: 25,
            changepoint_range: 0.8,
        }
    }
}

impl SeasonalConfig {
    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.changepoint_prior_scale > 0.0 && self.changepoint_prior_scale.is_finite()) {
            return Err(ForecastError::Config(
                "changepoint_prior_scale must be positive".to_string(),
            ));
        }
        if !(self.seasonality_prior_scale > 0.0 && self.seasonality_prior_scale.is_finite()) {
            return Err(ForecastError::Config(
                "seasonality_prior_scale must be positive".to_string(),
            ));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::Config(
                "changepoint_range must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fourier block for one seasonal period
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeasonBlock {
    period: f64,
    order: usize,
}

impl SeasonBlock {
    fn push_features(&self, day: f64, out: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * day / self.period;
            out.push(angle.sin());
            out.push(angle.cos());
        }
    }
}

/// Seasonal/trend model
#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendModel {
    config: SeasonalConfig,
}

impl SeasonalTrendModel {
    /// Create a new model with the given options
    pub fn new(config: SeasonalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Options in use
    pub fn config(&self) -> &SeasonalConfig {
        &self.config
    }
}

impl ForecastModel for SeasonalTrendModel {
    type Trained = SeasonalTrendFit;

    fn train(&self, history: &TimeSeriesData, _features: &[FeatureRow]) -> Result<SeasonalTrendFit> {
        let n = history.len();
        if n < 2 {
            return Err(MathError::InsufficientData(format!(
                "Trend fit needs at least 2 observations, have {}",
                n
            ))
            .into());
        }

        let dates = history.dates();
        let start = dates[0];
        let span = days_between(start, dates[n - 1]);
        let t_scale = span.max(1) as f64;

        let y_scale = history
            .values()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale < f64::EPSILON { 1.0 } else { y_scale };
        let y: Vec<f64> = history.values().iter().map(|v| v / y_scale).collect();

        let t: Vec<f64> = dates
            .iter()
            .map(|d| days_between(start, *d) as f64 / t_scale)
            .collect();
        let changepoints = place_changepoints(&t, self.config.n_changepoints, self.config.changepoint_range);

        let mut blocks = Vec::new();
        if span >= WEEKLY_MIN_SPAN {
            blocks.push(SeasonBlock { period: 7.0, order: 3 });
        }
        if span >= YEARLY_MIN_SPAN {
            blocks.push(SeasonBlock { period: 365.25, order: 10 });
        }

        let delta_penalty = (NOISE_SCALE / self.config.changepoint_prior_scale).powi(2);
        let beta_penalty = (NOISE_SCALE / self.config.seasonality_prior_scale).powi(2);

        let trend_rows: Vec<Vec<f64>> = t.iter().map(|&ti| trend_features(ti, &changepoints)).collect();
        let season_rows: Vec<Vec<f64>> = dates
            .iter()
            .map(|d| season_features(*d, &blocks))
            .collect();
        let n_trend = 2 + changepoints.len();
        let n_season = season_rows.first().map_or(0, Vec::len);

        let mut trend_penalties = vec![0.0, 0.0];
        trend_penalties.extend(std::iter::repeat(delta_penalty).take(changepoints.len()));

        let (trend_coef, season_coef) = match self.config.seasonality_mode {
            SeasonalityMode::Additive => {
                let design: Vec<Vec<f64>> = trend_rows
                    .iter()
                    .zip(&season_rows)
                    .map(|(tr, sr)| tr.iter().chain(sr).copied().collect())
                    .collect();
                let mut penalties = trend_penalties.clone();
                penalties.extend(std::iter::repeat(beta_penalty).take(n_season));

                let coef = ridge_least_squares(&design, &y, &penalties)?;
                (coef[..n_trend].to_vec(), coef[n_trend..].to_vec())
            }
            SeasonalityMode::Multiplicative => {
                let trend_coef = ridge_least_squares(&trend_rows, &y, &trend_penalties)?;
                let season_coef = if n_season == 0 {
                    Vec::new()
                } else {
                    let mut design = Vec::with_capacity(n);
                    let mut ratio = Vec::with_capacity(n);
                    for ((tr, sr), &yi) in trend_rows.iter().zip(&season_rows).zip(&y) {
                        let trend = predict_row(tr, &trend_coef);
                        if trend.abs() > 1e-6 {
                            design.push(sr.clone());
                            ratio.push(yi / trend - 1.0);
                        }
                    }
                    if design.is_empty() {
                        return Err(MathError::CalculationError(
                            "Trend is zero everywhere; multiplicative seasonality is undefined".to_string(),
                        )
                        .into());
                    }
                    ridge_least_squares(&design, &ratio, &vec![beta_penalty; n_season])?
                };
                (trend_coef, season_coef)
            }
        };

        debug!(
            changepoints = changepoints.len(),
            seasonal_terms = n_season,
            mode = ?self.config.seasonality_mode,
            "fitted seasonal/trend model"
        );

        Ok(SeasonalTrendFit {
            mode: self.config.seasonality_mode,
            start,
            t_scale,
            y_scale,
            changepoints,
            blocks,
            trend_coef,
            season_coef,
        })
    }

    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalTrend
    }
}

/// Potential changepoints spread evenly over the first `range` share of the history
fn place_changepoints(t: &[f64], max_count: usize, range: f64) -> Vec<f64> {
    let hist = ((t.len() as f64) * range).floor() as usize;
    let count = max_count.min(hist.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    (1..=count)
        .map(|k| {
            let idx = ((k * (hist - 1)) as f64 / count as f64).round() as usize;
            t[idx.min(t.len() - 1)]
        })
        .collect()
}

fn trend_features(t: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    row
}

fn season_features(date: NaiveDate, blocks: &[SeasonBlock]) -> Vec<f64> {
    // Absolute day number keeps the phase stable between history and future
    let day = date.num_days_from_ce() as f64;
    let mut row = Vec::new();
    for block in blocks {
        block.push_features(day, &mut row);
    }
    row
}

/// Trained seasonal/trend model
#[derive(Debug, Clone)]
pub struct SeasonalTrendFit {
    mode: SeasonalityMode,
    start: NaiveDate,
    t_scale: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    blocks: Vec<SeasonBlock>,
    trend_coef: Vec<f64>,
    season_coef: Vec<f64>,
}

impl SeasonalTrendFit {
    /// Model value on `date`, in native units
    pub fn predict(&self, date: NaiveDate) -> f64 {
        let t = days_between(self.start, date) as f64 / self.t_scale;
        let trend = predict_row(&trend_features(t, &self.changepoints), &self.trend_coef);
        let season = predict_row(&season_features(date, &self.blocks), &self.season_coef);

        let scaled = match self.mode {
            SeasonalityMode::Additive => trend + season,
            SeasonalityMode::Multiplicative => trend * (1.0 + season),
        };
        scaled * self.y_scale
    }
}

impl TrainedForecastModel for SeasonalTrendFit {
    fn forecast(&self, _context: &ForecastContext, dates: &[NaiveDate]) -> Result<ForecastResult> {
        let values = dates.iter().map(|d| self.predict(*d)).collect();
        ForecastResult::new(ModelKind::SeasonalTrend, dates.to_vec(), values)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalTrend
    }
}

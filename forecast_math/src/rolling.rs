//! Trailing window statistics
//!
//! Contains the rolling calculations used by feature engineering:
//! - Rolling Mean
//! - Rolling Standard Deviation (sample, n - 1)
//! - Lagged values

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Fixed-size trailing window over a stream of values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create a new rolling window with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Whether the window holds `period` values
    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    /// Mean of the window
    pub fn mean(&self) -> Result<f64> {
        if !self.is_full() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for rolling mean. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Sample standard deviation of the window
    pub fn std_dev(&self) -> Result<f64> {
        if !self.is_full() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for rolling standard deviation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }
        if self.period < 2 {
            return Err(MathError::InvalidInput(
                "Sample standard deviation needs a period of at least 2".to_string(),
            ));
        }

        let mean = self.sum / self.period as f64;
        let variance = self
            .values
            .iter()
            .map(|&value| {
                let diff = value - mean;
                diff * diff
            })
            .sum::<f64>()
            / (self.period - 1) as f64;

        Ok(variance.sqrt())
    }
}

/// Rolling mean aligned with the input; `None` until the window fills
pub fn rolling_mean(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period)?;
    Ok(values
        .iter()
        .map(|&value| {
            window.update(value);
            window.mean().ok()
        })
        .collect())
}

/// Rolling sample standard deviation aligned with the input
pub fn rolling_std(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period)?;
    Ok(values
        .iter()
        .map(|&value| {
            window.update(value);
            window.std_dev().ok()
        })
        .collect())
}

/// Value shifted forward by `offset` positions; `None` for the first `offset` entries
pub fn lagged(values: &[f64], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(offset).map(|j| values[j]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_mean_and_std() {
        let mut window = RollingWindow::new(3).unwrap();

        window.update(2.0);
        window.update(4.0);
        assert!(window.mean().is_err());

        window.update(6.0);
        assert!((window.mean().unwrap() - 4.0).abs() < 1e-12);
        assert!((window.std_dev().unwrap() - 2.0).abs() < 1e-12);

        // Oldest value (2.0) is evicted
        window.update(8.0);
        assert!((window.mean().unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_series_alignment() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let means = rolling_mean(&values, 2).unwrap();
        assert_eq!(means, vec![None, Some(1.5), Some(2.5), Some(3.5)]);

        let stds = rolling_std(&values, 3).unwrap();
        assert!(stds[0].is_none() && stds[1].is_none());
        assert!((stds[2].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lagged() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(lagged(&values, 1), vec![None, Some(10.0), Some(20.0)]);
        assert_eq!(lagged(&values, 5), vec![None, None, None]);
    }

    #[test]
    fn test_invalid_period() {
        assert!(RollingWindow::new(0).is_err());
        let mut single = RollingWindow::new(1).unwrap();
        single.update(3.0);
        assert!(single.std_dev().is_err());
    }
}

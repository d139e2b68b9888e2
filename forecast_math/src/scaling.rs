//! Min/max normalisation

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Scales values into [0, 1] using bounds fitted once on a reference sample.
///
/// A constant sample has zero range; the scaler then only shifts by the
/// minimum so values still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the bounds on `values`
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a scaler on an empty sample".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Scaler sample contains non-finite values".to_string(),
            ));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            1.0
        } else {
            range
        }
    }

    /// Map a raw value into the fitted scale
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    /// Map a scaled value back to raw units
    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    /// Lower bound seen at fit time
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound seen at fit time
    pub fn max(&self) -> f64 {
        self.max
    }
}

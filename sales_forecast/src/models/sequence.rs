//! Sequence model
//!
//! Single-layer LSTM that predicts the next normalised value from the
//! previous [`SEQUENCE_WINDOW`] normalised values. The min/max scaler is fitted
//! once on the training history and reused unchanged for every forecast.
//! Forecasts roll forward autoregressively: each prediction joins the input
//! window of the next step, so error compounds over long horizons.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::features::FeatureRow;
use crate::models::{ForecastContext, ForecastModel, ForecastResult, ModelKind, TrainedForecastModel};
use chrono::NaiveDate;
use forecast_math::{MathError, MinMaxScaler};
use ndarray::{s, Array1, Array2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of past values fed to the network
pub const SEQUENCE_WINDOW: usize = 5;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Sequence model options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// LSTM hidden state size
    pub hidden_units: usize,
    /// Dropout rate on the final hidden state during training
    pub dropout: f64,
    /// Passes over the training windows
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Global gradient norm limit
    pub gradient_clip: f64,
    /// RNG seed for weight init, shuffling and dropout
    pub seed: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            hidden_units: 50,
            dropout: 0.2,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            gradient_clip: 1.0,
            seed: 42,
        }
    }
}

impl SequenceConfig {
    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if self.hidden_units == 0 {
            return Err(ForecastError::Config("hidden_units must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::Config("dropout must be in [0, 1)".to_string()));
        }
        if self.epochs == 0 {
            return Err(ForecastError::Config("epochs must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::Config("batch_size must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::Config(
                "sequence learning_rate must be positive".to_string(),
            ));
        }
        if !(self.gradient_clip > 0.0) {
            return Err(ForecastError::Config("gradient_clip must be positive".to_string()));
        }
        Ok(())
    }
}

/// Per-step activations kept for backpropagation
struct StepCache {
    input: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c_prev: Array1<f64>,
    tanh_c: Array1<f64>,
}

/// Parameters (or gradients, or optimiser moments) of the network
#[derive(Debug, Clone)]
struct LstmParams {
    /// Gate weights over `[x; h]`, gates stacked as input, forget, candidate, output
    w: Array2<f64>,
    b: Array1<f64>,
    w_out: Array1<f64>,
    b_out: f64,
}

impl LstmParams {
    fn zeros(hidden: usize) -> Self {
        Self {
            w: Array2::zeros((4 * hidden, 1 + hidden)),
            b: Array1::zeros(4 * hidden),
            w_out: Array1::zeros(hidden),
            b_out: 0.0,
        }
    }

    fn init(hidden: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        let mut params = Self::zeros(hidden);
        params.w.mapv_inplace(|_| rng.sample(dist));
        params.w_out.mapv_inplace(|_| rng.sample(dist));
        // Forget gate starts open
        params.b.slice_mut(s![hidden..2 * hidden]).fill(1.0);
        params
    }

    fn norm(&self) -> f64 {
        (self.w.iter().map(|v| v * v).sum::<f64>()
            + self.b.iter().map(|v| v * v).sum::<f64>()
            + self.w_out.iter().map(|v| v * v).sum::<f64>()
            + self.b_out * self.b_out)
            .sqrt()
    }

    fn scale(&mut self, factor: f64) {
        self.w *= factor;
        self.b *= factor;
        self.w_out *= factor;
        self.b_out *= factor;
    }
}

/// Adam optimiser state
struct Adam {
    learning_rate: f64,
    step: i32,
    m: LstmParams,
    v: LstmParams,
}

impl Adam {
    fn new(hidden: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            step: 0,
            m: LstmParams::zeros(hidden),
            v: LstmParams::zeros(hidden),
        }
    }

    fn update(&mut self, params: &mut LstmParams, grads: &LstmParams) {
        self.step += 1;
        let c1 = 1.0 - ADAM_BETA1.powi(self.step);
        let c2 = 1.0 - ADAM_BETA2.powi(self.step);
        let lr = self.learning_rate;

        adam_apply(&mut params.w, &grads.w, &mut self.m.w, &mut self.v.w, lr, c1, c2);
        adam_apply(&mut params.b, &grads.b, &mut self.m.b, &mut self.v.b, lr, c1, c2);
        adam_apply(&mut params.w_out, &grads.w_out, &mut self.m.w_out, &mut self.v.w_out, lr, c1, c2);

        let g = grads.b_out;
        self.m.b_out = ADAM_BETA1 * self.m.b_out + (1.0 - ADAM_BETA1) * g;
        self.v.b_out = ADAM_BETA2 * self.v.b_out + (1.0 - ADAM_BETA2) * g * g;
        params.b_out -= lr * (self.m.b_out / c1) / ((self.v.b_out / c2).sqrt() + ADAM_EPSILON);
    }
}

fn adam_apply<D: Dimension>(
    param: &mut ndarray::Array<f64, D>,
    grad: &ndarray::Array<f64, D>,
    m: &mut ndarray::Array<f64, D>,
    v: &mut ndarray::Array<f64, D>,
    lr: f64,
    c1: f64,
    c2: f64,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            *p -= lr * (*m / c1) / ((*v / c2).sqrt() + ADAM_EPSILON);
        });
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// LSTM network with a linear read-out of the last hidden state
#[derive(Debug, Clone)]
struct LstmNetwork {
    hidden: usize,
    params: LstmParams,
}

impl LstmNetwork {
    fn forward(&self, window: &[f64], mask: &Array1<f64>) -> (f64, Vec<StepCache>, Array1<f64>) {
        let h_size = self.hidden;
        let mut h = Array1::<f64>::zeros(h_size);
        let mut c = Array1::<f64>::zeros(h_size);
        let mut caches = Vec::with_capacity(window.len());

        for &x in window {
            let mut input = Array1::<f64>::zeros(1 + h_size);
            input[0] = x;
            input.slice_mut(s![1..]).assign(&h);

            let z = self.params.w.dot(&input) + &self.params.b;
            let i = z.slice(s![0..h_size]).mapv(sigmoid);
            let f = z.slice(s![h_size..2 * h_size]).mapv(sigmoid);
            let g = z.slice(s![2 * h_size..3 * h_size]).mapv(f64::tanh);
            let o = z.slice(s![3 * h_size..4 * h_size]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            caches.push(StepCache {
                input,
                i,
                f,
                g,
                o,
                c_prev: c,
                tanh_c,
            });
            c = c_next;
            h = h_next;
        }

        let output = self.params.w_out.dot(&(&h * mask)) + self.params.b_out;
        (output, caches, h)
    }

    fn predict(&self, window: &[f64]) -> f64 {
        let mask = Array1::ones(self.hidden);
        self.forward(window, &mask).0
    }

    /// Accumulate gradients of `scale * (prediction - target)^2`; returns the squared error
    fn backward(
        &self,
        window: &[f64],
        target: f64,
        mask: &Array1<f64>,
        scale: f64,
        grads: &mut LstmParams,
    ) -> f64 {
        let h_size = self.hidden;
        let (prediction, caches, h_last) = self.forward(window, mask);
        let error = prediction - target;
        let d_out = 2.0 * error * scale;

        let dropped = &h_last * mask;
        grads.w_out.scaled_add(d_out, &dropped);
        grads.b_out += d_out;

        let mut dh = &self.params.w_out * mask * d_out;
        let mut dc = Array1::<f64>::zeros(h_size);

        for cache in caches.iter().rev() {
            let d_o = &dh * &cache.tanh_c;
            dc = dc + &dh * &cache.o * &cache.tanh_c.mapv(|t| 1.0 - t * t);

            let d_i = &dc * &cache.g;
            let d_g = &dc * &cache.i;
            let d_f = &dc * &cache.c_prev;
            let dc_prev = &dc * &cache.f;

            let mut dz = Array1::<f64>::zeros(4 * h_size);
            dz.slice_mut(s![0..h_size])
                .assign(&(&d_i * &cache.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![h_size..2 * h_size])
                .assign(&(&d_f * &cache.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * h_size..3 * h_size])
                .assign(&(&d_g * &cache.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * h_size..4 * h_size])
                .assign(&(&d_o * &cache.o.mapv(|v| v * (1.0 - v))));

            let outer = dz
                .view()
                .insert_axis(Axis(1))
                .dot(&cache.input.view().insert_axis(Axis(0)));
            grads.w += &outer;
            grads.b += &dz;

            let d_input = self.params.w.t().dot(&dz);
            dh = d_input.slice(s![1..]).to_owned();
            dc = dc_prev;
        }

        error * error
    }
}

/// Sequence model
#[derive(Debug, Clone, Default)]
pub struct SequenceModel {
    config: SequenceConfig,
}

impl SequenceModel {
    /// Create a new model with the given options
    pub fn new(config: SequenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Options in use
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    fn dropout_mask(&self, rng: &mut StdRng) -> Array1<f64> {
        let hidden = self.config.hidden_units;
        let p = self.config.dropout;
        if p == 0.0 {
            return Array1::ones(hidden);
        }
        let keep_scale = 1.0 / (1.0 - p);
        Array1::from_shape_fn(hidden, |_| if rng.gen::<f64>() < p { 0.0 } else { keep_scale })
    }
}

impl ForecastModel for SequenceModel {
    type Trained = SequenceFit;

    fn train(&self, history: &TimeSeriesData, _features: &[FeatureRow]) -> Result<SequenceFit> {
        let values = history.values();
        if values.len() <= SEQUENCE_WINDOW {
            return Err(MathError::InsufficientData(format!(
                "Sequence model needs more than {} observations, have {}",
                SEQUENCE_WINDOW,
                values.len()
            ))
            .into());
        }

        let scaler = MinMaxScaler::fit(values)?;
        let normalized: Vec<f64> = values.iter().map(|v| scaler.transform(*v)).collect();
        let samples: Vec<(&[f64], f64)> = (SEQUENCE_WINDOW..normalized.len())
            .map(|end| (&normalized[end - SEQUENCE_WINDOW..end], normalized[end]))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = LstmNetwork {
            hidden: self.config.hidden_units,
            params: LstmParams::init(self.config.hidden_units, &mut rng),
        };
        let mut optimiser = Adam::new(self.config.hidden_units, self.config.learning_rate);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut last_loss = f64::NAN;

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(self.config.batch_size) {
                let mut grads = LstmParams::zeros(self.config.hidden_units);
                let scale = 1.0 / batch.len() as f64;

                for &idx in batch {
                    let (window, target) = samples[idx];
                    let mask = self.dropout_mask(&mut rng);
                    epoch_loss += network.backward(window, target, &mask, scale, &mut grads);
                }

                let norm = grads.norm();
                if !norm.is_finite() {
                    return Err(MathError::CalculationError(format!(
                        "Gradient diverged in epoch {}",
                        epoch
                    ))
                    .into());
                }
                if norm > self.config.gradient_clip {
                    grads.scale(self.config.gradient_clip / norm);
                }
                optimiser.update(&mut network.params, &grads);
            }

            last_loss = epoch_loss / samples.len() as f64;
        }

        if !last_loss.is_finite() {
            return Err(MathError::CalculationError(
                "Sequence model training loss is not finite".to_string(),
            )
            .into());
        }
        debug!(
            windows = samples.len(),
            epochs = self.config.epochs,
            loss = last_loss,
            "fitted sequence model"
        );

        Ok(SequenceFit {
            network,
            scaler,
            final_loss: last_loss,
        })
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Sequence
    }
}

/// Trained sequence model
#[derive(Debug, Clone)]
pub struct SequenceFit {
    network: LstmNetwork,
    scaler: MinMaxScaler,
    final_loss: f64,
}

impl SequenceFit {
    /// Normalisation fitted on the training history
    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Mean squared error of the last training epoch (normalised units)
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    /// Roll forward `horizon` steps from the last [`SEQUENCE_WINDOW`] raw values
    pub fn rollout(&self, recent: &[f64], horizon: usize) -> Result<Vec<f64>> {
        if recent.len() < SEQUENCE_WINDOW {
            return Err(ForecastError::InvalidInput(format!(
                "Sequence forecast needs the last {} observations, have {}",
                SEQUENCE_WINDOW,
                recent.len()
            )));
        }

        let mut window: Vec<f64> = recent[recent.len() - SEQUENCE_WINDOW..]
            .iter()
            .map(|v| self.scaler.transform(*v))
            .collect();
        let mut output = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = self.network.predict(&window);
            output.push(self.scaler.inverse(next));
            window.remove(0);
            window.push(next);
        }

        Ok(output)
    }
}

impl TrainedForecastModel for SequenceFit {
    fn forecast(&self, context: &ForecastContext, dates: &[NaiveDate]) -> Result<ForecastResult> {
        let values = self.rollout(context.series().values(), dates.len())?;
        ForecastResult::new(ModelKind::Sequence, dates.to_vec(), values)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Sequence
    }
}

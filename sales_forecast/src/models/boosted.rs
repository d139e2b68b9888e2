//! Gradient-boosted regression trees over the engineered feature table

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FEATURE_COUNT};
use crate::models::{ForecastContext, ForecastModel, ForecastResult, ModelKind, TrainedForecastModel};
use chrono::NaiveDate;
use forecast_math::MathError;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use tracing::debug;

/// Smallest SSE reduction accepted for a split
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Loss minimised by the boosting rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    SquaredError,
    AbsoluteError,
}

/// Boosted tree options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostedConfig {
    pub max_depth: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub objective: Objective,
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostedConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            learning_rate: 0.1,
            objective: Objective::SquaredError,
            n_estimators: 100,
            min_samples_leaf: 1,
        }
    }
}

impl BoostedConfig {
    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ForecastError::Config("max_depth must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::Config(
                "tree learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(ForecastError::Config("n_estimators must be positive".to_string()));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::Config(
                "min_samples_leaf must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            TreeNode::Leaf(value) => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn count_splits(&self, counts: &mut [usize; FEATURE_COUNT]) {
        if let TreeNode::Split {
            feature,
            left,
            right,
            ..
        } = self
        {
            counts[*feature] += 1;
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Fits one regression tree to the pseudo-residuals of a boosting round
struct TreeBuilder<'a> {
    rows: &'a [[f64; FEATURE_COUNT]],
    gradients: &'a [f64],
    residuals: &'a [f64],
    config: &'a BoostedConfig,
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, indices: Vec<usize>, depth: usize) -> TreeNode {
        if depth >= self.config.max_depth || indices.len() < 2 * self.config.min_samples_leaf {
            return TreeNode::Leaf(self.leaf_value(&indices));
        }

        match self.best_split(&indices) {
            Some(split) => {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| self.rows[i][split.feature] <= split.threshold);
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(self.build(left, depth + 1)),
                    right: Box::new(self.build(right, depth + 1)),
                }
            }
            None => TreeNode::Leaf(self.leaf_value(&indices)),
        }
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        match self.config.objective {
            Objective::SquaredError => {
                indices.iter().map(|&i| self.gradients[i]).sum::<f64>() / indices.len() as f64
            }
            Objective::AbsoluteError => {
                Data::new(indices.iter().map(|&i| self.residuals[i]).collect::<Vec<_>>()).median()
            }
        }
    }

    fn best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf;
        let total: f64 = indices.iter().map(|&i| self.gradients[i]).sum();
        let parent_score = total * total / n as f64;
        let mut best: Option<SplitCandidate> = None;

        let mut order = indices.to_vec();
        for feature in 0..FEATURE_COUNT {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_sum = 0.0;
            for split_at in 1..n {
                left_sum += self.gradients[order[split_at - 1]];
                let lower = self.rows[order[split_at - 1]][feature];
                let upper = self.rows[order[split_at]][feature];
                if lower == upper || split_at < min_leaf || n - split_at < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let score = left_sum * left_sum / split_at as f64
                    + right_sum * right_sum / (n - split_at) as f64;
                let gain = score - parent_score;
                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (lower + upper) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Gradient-boosted tree model
#[derive(Debug, Clone, Default)]
pub struct BoostedTreeModel {
    config: BoostedConfig,
}

impl BoostedTreeModel {
    /// Create a new model with the given options
    pub fn new(config: BoostedConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Options in use
    pub fn config(&self) -> &BoostedConfig {
        &self.config
    }
}

impl ForecastModel for BoostedTreeModel {
    type Trained = BoostedTreeFit;

    fn train(&self, _history: &TimeSeriesData, features: &[FeatureRow]) -> Result<BoostedTreeFit> {
        if features.is_empty() {
            return Err(MathError::InsufficientData(
                "Boosted trees need at least one feature row".to_string(),
            )
            .into());
        }

        let rows: Vec<[f64; FEATURE_COUNT]> = features.iter().map(FeatureRow::to_vector).collect();
        let targets: Vec<f64> = features.iter().map(|row| row.value).collect();

        let base_score = match self.config.objective {
            Objective::SquaredError => targets.iter().sum::<f64>() / targets.len() as f64,
            Objective::AbsoluteError => Data::new(targets.clone()).median(),
        };

        let mut predictions = vec![base_score; targets.len()];
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let gradients: Vec<f64> = match self.config.objective {
                Objective::SquaredError => residuals.clone(),
                Objective::AbsoluteError => residuals
                    .iter()
                    .map(|r| if *r == 0.0 { 0.0 } else { r.signum() })
                    .collect(),
            };

            let builder = TreeBuilder {
                rows: &rows,
                gradients: &gradients,
                residuals: &residuals,
                config: &self.config,
            };
            let tree = builder.build((0..rows.len()).collect(), 0);

            for (prediction, row) in predictions.iter_mut().zip(&rows) {
                *prediction += self.config.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(MathError::CalculationError(
                "Boosted tree predictions are not finite".to_string(),
            )
            .into());
        }
        let fit = BoostedTreeFit {
            base_score,
            learning_rate: self.config.learning_rate,
            trees,
        };
        debug!(
            rows = rows.len(),
            trees = fit.tree_count(),
            base_score,
            splits = ?fit.feature_usage(),
            "fitted boosted trees"
        );

        Ok(fit)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::BoostedTree
    }
}

/// Trained tree ensemble
#[derive(Debug, Clone)]
pub struct BoostedTreeFit {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<TreeNode>,
}

impl BoostedTreeFit {
    /// Predict the value for one feature row
    pub fn predict_row(&self, row: &FeatureRow) -> f64 {
        let features = row.to_vector();
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.learning_rate * tree.predict(&features))
                .sum::<f64>()
    }

    /// Number of boosting rounds
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Deepest tree in the ensemble
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    /// Split count per feature name, most used first; unused features are left out
    pub fn feature_usage(&self) -> Vec<(&'static str, usize)> {
        let mut counts = [0usize; FEATURE_COUNT];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }

        let mut usage: Vec<(&'static str, usize)> = FeatureRow::feature_names()
            .into_iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1));
        usage
    }
}

impl TrainedForecastModel for BoostedTreeFit {
    /// Lag and rolling features stay frozen at the last observed row; only the calendar advances
    fn forecast(&self, context: &ForecastContext, dates: &[NaiveDate]) -> Result<ForecastResult> {
        let template = context.features().last().ok_or_else(|| {
            ForecastError::InvalidInput("Forecast context has no feature rows".to_string())
        })?;

        let values = dates
            .iter()
            .map(|date| self.predict_row(&FeatureRow::carried_forward(*date, template)))
            .collect();
        ForecastResult::new(ModelKind::BoostedTree, dates.to_vec(), values)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::BoostedTree
    }
}

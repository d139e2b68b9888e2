//! Engine configuration
//!
//! Every section and field is optional; anything absent from the JSON falls
//! back to its default.

use crate::data::CleanOptions;
use crate::ensemble::EnsembleWeights;
use crate::error::Result;
use crate::models::{BoostedConfig, SeasonalConfig, SequenceConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options for all three models, the ensemble weights and source cleaning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seasonal: SeasonalConfig,
    pub sequence: SequenceConfig,
    #[serde(alias = "tree")]
    pub boosted: BoostedConfig,
    pub weights: EnsembleWeights,
    pub cleaning: CleanOptions,
}

impl EngineConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.seasonal.validate()?;
        self.sequence.validate()?;
        self.boosted.validate()?;
        self.weights.validate()
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyError};
use crate::loss::reduction::Reduction;

/// Which optimiser drives the parameter updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

/// Everything that defines a run. Stored verbatim in every checkpoint, and a
/// loaded checkpoint's copy replaces whatever the caller passed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of bodies P predicted by one model.
    pub planets: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Observer latitude, degrees.
    pub latitude: f64,
    /// Observer longitude, degrees.
    pub longitude: f64,
    /// Observer altitude, metres.
    pub altitude: f64,
    /// Run numeric work on the parallel pool.
    #[serde(default)]
    pub accelerator: bool,
    /// Batches collated ahead of the training loop; 0 collates inline.
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default)]
    pub reduction: Reduction,
}

fn default_model() -> String {
    "baseline".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            planets: 5,
            epochs: 20,
            batch_size: 512,
            learning_rate: 1e-4,
            latitude: 78.9629,
            longitude: 20.5937,
            altitude: 0.0,
            accelerator: false,
            workers: 8,
            seed: 0,
            model: default_model(),
            optimizer: OptimizerKind::Adam,
            reduction: Reduction::Sum,
        }
    }
}

impl Config {
    /// Rejects values no run can start from, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.planets == 0 {
            return Err(SkyError::config("planets", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(SkyError::config("batch_size", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SkyError::config(
                "learning_rate",
                format!("must be a positive number, got {}", self.learning_rate),
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SkyError::config(
                "latitude",
                format!("must lie in [-90, 90], got {}", self.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SkyError::config(
                "longitude",
                format!("must lie in [-180, 180], got {}", self.longitude),
            ));
        }
        if !self.altitude.is_finite() {
            return Err(SkyError::config("altitude", "must be finite"));
        }
        if self.model.trim().is_empty() {
            return Err(SkyError::config("model", "must name a registered variant"));
        }
        Ok(())
    }
}

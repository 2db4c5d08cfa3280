pub mod registry;
pub mod regressor;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::position::AzAlt;
use crate::layers::dense::{Layer, LayerGradients};
use crate::network::{LoadReport, StateDict};

pub use registry::{ModelRegistry, RegressorFactory};
pub use regressor::PositionRegressor;

/// Predicted or true positions for a batch, indexed `[sample][body]`.
pub type SkyBatch = Vec<Vec<AzAlt>>;

/// What the trainer and evaluator need from a model variant.
pub trait Regressor: Send {
    /// Registry name of the variant.
    fn variant(&self) -> &str;

    fn config(&self) -> &Config;

    fn planets(&self) -> usize {
        self.config().planets
    }

    /// Training forward pass; keeps whatever `backward` needs.
    fn forward(&mut self, times: &[f64]) -> Result<SkyBatch>;

    /// Inference pass. Takes `&self`, so nothing is retained for gradients.
    fn predict(&self, times: &[f64]) -> Result<SkyBatch>;

    /// Parameter gradients given ∂loss/∂(azimuth, altitude) for the batch of
    /// the last `forward`, one entry per layer.
    fn backward(&self, position_grad: &[Vec<AzAlt>]) -> Result<Vec<LayerGradients>>;

    fn layers_mut(&mut self) -> &mut [Layer];

    fn state_dict(&self) -> StateDict;

    fn load_state_dict(&mut self, dict: &StateDict) -> Result<LoadReport>;

    /// Drops everything cached by the last training forward pass.
    fn release_transient(&mut self);
}

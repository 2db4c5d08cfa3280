use serde::{Serialize, Deserialize};

use crate::config::{Config, OptimizerKind};
use crate::layers::dense::{Layer, LayerGradients};
use crate::optim::adam::Adam;
use crate::optim::sgd::Sgd;

/// The optimiser a run trains with, including its internal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    Adam(Adam),
    Sgd(Sgd),
}

impl Optimizer {
    pub fn from_config(config: &Config) -> Optimizer {
        match config.optimizer {
            OptimizerKind::Adam => Optimizer::Adam(Adam::new(config.learning_rate)),
            OptimizerKind::Sgd => Optimizer::Sgd(Sgd::new(config.learning_rate)),
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            Optimizer::Adam(_) => OptimizerKind::Adam,
            Optimizer::Sgd(_) => OptimizerKind::Sgd,
        }
    }

    pub fn step(&mut self, layers: &mut [Layer], grads: &[LayerGradients]) {
        match self {
            Optimizer::Adam(adam) => adam.step(layers, grads),
            Optimizer::Sgd(sgd) => {
                for (layer, g) in layers.iter_mut().zip(grads.iter()) {
                    sgd.step(layer, g);
                }
            }
        }
    }
}

use serde::{Serialize, Deserialize};
use crate::activation::activation::ActivationFunction;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`:       number of neurons in this layer
/// - `input_size`: number of neurons feeding into this layer (i.e. the output
///               size of the previous layer, or the raw input dimension for
///               the first layer)
/// - `activation`: activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

impl LayerSpec {
    pub fn new(input_size: usize, size: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec { size, input_size, activation }
    }
}

/// The position regressor's stack: P → 8 → 16 → 3P, ReLU after the first two.
pub fn baseline_layers(planets: usize) -> Vec<LayerSpec> {
    vec![
        LayerSpec::new(planets, 8, ActivationFunction::ReLU),
        LayerSpec::new(8, 16, ActivationFunction::ReLU),
        LayerSpec::new(16, planets * 3, ActivationFunction::Identity),
    ]
}

use std::collections::BTreeMap;

use rand::Rng;

use crate::context::ExecutionContext;
use crate::error::{Result, SkyError};
use crate::layers::dense::{Layer, LayerGradients};
use crate::math::matrix::Matrix;
use crate::network::spec::LayerSpec;

/// Parameters keyed by name (`linear_1.weight`, `linear_1.bias`, ...).
pub type StateDict = BTreeMap<String, Matrix>;

/// What a permissive load did not line up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Parameters the network has but the source lacked; left as initialised.
    pub missing: Vec<String>,
    /// Parameters the source carried that the network does not know.
    pub unexpected: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Layer>,
    ctx: ExecutionContext,
}

impl Network {
    pub fn new<R: Rng + ?Sized>(
        layer_specs: &[LayerSpec],
        ctx: ExecutionContext,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs.iter()
            .map(|spec| Layer::new(spec.size, spec.input_size, spec.activation, rng))
            .collect();
        Network { layers, ctx }
    }

    pub fn context(&self) -> ExecutionContext {
        self.ctx
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: Matrix) -> Result<Matrix> {
        let ctx = self.ctx;
        let mut current = input;
        for layer in &mut self.layers {
            current = layer.feed_from(current, ctx)?;
        }
        Ok(current)
    }

    /// Forward pass that caches nothing.
    pub fn infer(&self, input: &Matrix) -> Result<Matrix> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.infer(&current, self.ctx)?;
        }
        Ok(current)
    }

    /// Propagates ∂L/∂output back through every layer, last to first.
    ///
    /// Returned gradients are in layer order.
    pub fn backward(&self, output_delta: Matrix) -> Result<Vec<LayerGradients>> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = output_delta;
        for layer in self.layers.iter().rev() {
            let (g, input_delta) = layer.compute_gradients(&delta, self.ctx)?;
            grads.push(g);
            delta = input_delta;
        }
        grads.reverse();
        Ok(grads)
    }

    pub fn clear_cache(&mut self) {
        for layer in &mut self.layers {
            layer.clear_cache();
        }
    }

    pub fn state_dict(&self) -> StateDict {
        let mut dict = StateDict::new();
        for (i, layer) in self.layers.iter().enumerate() {
            dict.insert(weight_key(i), layer.weights.clone());
            dict.insert(bias_key(i), layer.biases.clone());
        }
        dict
    }

    /// Copies every parameter whose name is present in `dict`.
    ///
    /// Absent or unknown names are tolerated and reported; a known name with
    /// the wrong shape is an error because it means a different architecture.
    pub fn load_state_dict(&mut self, dict: &StateDict) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut known = Vec::with_capacity(self.layers.len() * 2);

        for (i, layer) in self.layers.iter_mut().enumerate() {
            for (key, target) in [(weight_key(i), &mut layer.weights), (bias_key(i), &mut layer.biases)] {
                match dict.get(&key) {
                    Some(source) if source.same_shape(target) => *target = source.clone(),
                    Some(source) => {
                        return Err(SkyError::State(format!(
                            "parameter `{key}` has shape {}x{}, model expects {}x{}",
                            source.rows, source.cols, target.rows, target.cols
                        )))
                    }
                    None => report.missing.push(key.clone()),
                }
                known.push(key);
            }
        }

        report.unexpected = dict.keys()
            .filter(|k| !known.contains(k))
            .cloned()
            .collect();
        Ok(report)
    }
}

fn weight_key(index: usize) -> String {
    format!("linear_{}.weight", index + 1)
}

fn bias_key(index: usize) -> String {
    format!("linear_{}.bias", index + 1)
}

use serde::{Serialize, Deserialize};

use crate::layers::dense::{Layer, LayerGradients};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one SGD weight update to a layer given its pre-computed gradients.
    pub fn step(&self, layer: &mut Layer, grads: &LayerGradients) {
        let lr = self.learning_rate;
        layer.weights = layer.weights.clone() - grads.weights.map(|x| x * lr);
        layer.biases = layer.biases.clone() - grads.biases.map(|x| x * lr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::math::Matrix;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn step_moves_against_the_gradient() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut layer = Layer::new(1, 1, ActivationFunction::Identity, &mut rng);
        layer.weights = Matrix::from_rows(vec![vec![1.0]]).unwrap();
        layer.biases = Matrix::from_rows(vec![vec![0.0]]).unwrap();
        let grads = LayerGradients {
            weights: Matrix::from_rows(vec![vec![2.0]]).unwrap(),
            biases: Matrix::from_rows(vec![vec![-1.0]]).unwrap(),
        };
        Sgd::new(0.1).step(&mut layer, &grads);
        assert!((layer.weights.data[0][0] - 0.8).abs() < 1e-12);
        assert!((layer.biases.data[0][0] - 0.1).abs() < 1e-12);
    }
}

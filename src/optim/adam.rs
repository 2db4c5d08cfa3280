use serde::{Serialize, Deserialize};

use crate::layers::dense::{Layer, LayerGradients};
use crate::math::matrix::Matrix;

/// First and second moment estimates for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub m_weights: Matrix,
    pub v_weights: Matrix,
    pub m_biases: Matrix,
    pub v_biases: Matrix,
}

impl Moments {
    fn zeros_like(layer: &Layer) -> Moments {
        let w = || Matrix::zeros(layer.weights.rows, layer.weights.cols);
        let b = || Matrix::zeros(layer.biases.rows, layer.biases.cols);
        Moments { m_weights: w(), v_weights: w(), m_biases: b(), v_biases: b() }
    }

    fn fits(&self, layer: &Layer) -> bool {
        self.m_weights.same_shape(&layer.weights) && self.m_biases.same_shape(&layer.biases)
    }
}

/// Adam with bias correction (Kingma & Ba), torch default hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Number of steps taken so far.
    pub step: u64,
    pub moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            moments: Vec::new(),
        }
    }

    /// One update of every layer. Moment buffers are created lazily and rebuilt
    /// if the layer shapes no longer match them.
    pub fn step(&mut self, layers: &mut [Layer], grads: &[LayerGradients]) {
        if self.moments.len() != layers.len()
            || self.moments.iter().zip(layers.iter()).any(|(m, l)| !m.fits(l))
        {
            self.moments = layers.iter().map(Moments::zeros_like).collect();
            self.step = 0;
        }

        self.step += 1;
        let t = self.step as i32;
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);
        let (b1, b2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);

        for ((layer, g), m) in layers.iter_mut().zip(grads.iter()).zip(self.moments.iter_mut()) {
            update(&mut layer.weights, &g.weights, &mut m.m_weights, &mut m.v_weights, b1, b2, eps, lr, bias1, bias2);
            update(&mut layer.biases, &g.biases, &mut m.m_biases, &mut m.v_biases, b1, b2, eps, lr, bias1, bias2);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn update(
    param: &mut Matrix,
    grad: &Matrix,
    m: &mut Matrix,
    v: &mut Matrix,
    beta1: f64,
    beta2: f64,
    eps: f64,
    lr: f64,
    bias1: f64,
    bias2: f64,
) {
    for i in 0..param.rows {
        for j in 0..param.cols {
            let g = grad.data[i][j];
            m.data[i][j] = beta1 * m.data[i][j] + (1.0 - beta1) * g;
            v.data[i][j] = beta2 * v.data[i][j] + (1.0 - beta2) * g * g;
            let m_hat = m.data[i][j] / bias1;
            let v_hat = v.data[i][j] / bias2;
            param.data[i][j] -= lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scalar_layer(w: f64) -> Layer {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut layer = Layer::new(1, 1, ActivationFunction::Identity, &mut rng);
        layer.weights = Matrix::from_rows(vec![vec![w]]).unwrap();
        layer.biases = Matrix::from_rows(vec![vec![0.0]]).unwrap();
        layer
    }

    fn grads(w: f64) -> LayerGradients {
        LayerGradients {
            weights: Matrix::from_rows(vec![vec![w]]).unwrap(),
            biases: Matrix::from_rows(vec![vec![0.0]]).unwrap(),
        }
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction the first update is lr·g/|g|.
        let mut layers = vec![scalar_layer(1.0)];
        let mut adam = Adam::new(0.01);
        adam.step(&mut layers, &[grads(5.0)]);
        assert!((layers[0].weights.data[0][0] - 0.99).abs() < 1e-9);
        assert_eq!(layers[0].biases.data[0][0], 0.0);
        assert_eq!(adam.step, 1);
    }

    #[test]
    fn minimises_a_quadratic() {
        // L = (w - 3)², dL/dw = 2(w - 3)
        let mut layers = vec![scalar_layer(0.0)];
        let mut adam = Adam::new(0.1);
        for _ in 0..500 {
            let w = layers[0].weights.data[0][0];
            adam.step(&mut layers, &[grads(2.0 * (w - 3.0))]);
        }
        assert!((layers[0].weights.data[0][0] - 3.0).abs() < 1e-2);
    }

    #[test]
    fn state_survives_serialisation() {
        let mut layers = vec![scalar_layer(1.0)];
        let mut adam = Adam::new(0.01);
        adam.step(&mut layers, &[grads(1.0)]);
        let json = serde_json::to_string(&adam).unwrap();
        let back: Adam = serde_json::from_str(&json).unwrap();
        assert_eq!(back, adam);
    }
}

use rand::Rng;

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};
use crate::context::ExecutionContext;
use crate::error::{Result, SkyError};

/// Parameter gradients of one layer for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl LayerGradients {
    pub fn zeros_like(layer: &Layer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
        }
    }
}

/// Fully-connected layer operating on a whole batch at once (one sample per row).
#[derive(Debug, Clone)]
pub struct Layer{
    pub size: usize,
    pub input_size: usize,
    /// Shape (input_size, size).
    pub weights: Matrix,
    /// Shape (1, size).
    pub biases: Matrix,
    pub activator: ActivationFunction,
    inputs: Matrix,       // batch fed to the last training forward pass
    pre_neurons: Matrix,  // pre-activation values (z = Wx + b) needed for correct derivative
}

impl Layer {
    /// Initialises weights and biases from U(-1/sqrt(fan_in), 1/sqrt(fan_in)).
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let bound = 1.0 / (input_size.max(1) as f64).sqrt();
        let weights = Matrix::uniform(input_size, size, bound, rng);
        let biases = Matrix::uniform(1, size, bound, rng);

        Layer {
            size,
            input_size,
            weights,
            biases,
            activator: activation,
            inputs: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    fn linear(&self, input: &Matrix, ctx: ExecutionContext) -> Result<Matrix> {
        if input.cols != self.input_size {
            return Err(SkyError::shape(
                "dense layer input",
                vec![input.rows, self.input_size],
                vec![input.rows, input.cols],
            ));
        }
        Ok(input.matmul(&self.weights, ctx)?.add_row(&self.biases))
    }

    /// Training forward pass; keeps what `compute_gradients` needs.
    pub fn feed_from(&mut self, input: Matrix, ctx: ExecutionContext) -> Result<Matrix> {
        let z = self.linear(&input, ctx)?;
        let a = z.map(|x| self.activator.function(x));
        self.inputs = input;
        self.pre_neurons = z;
        Ok(a)
    }

    /// Inference-only forward pass; leaves no trace for backpropagation.
    pub fn infer(&self, input: &Matrix, ctx: ExecutionContext) -> Result<Matrix> {
        let z = self.linear(input, ctx)?;
        Ok(z.map(|x| self.activator.function(x)))
    }

    /// Backward pass for the batch seen by the last `feed_from`.
    ///
    /// `next_layer_delta` is ∂L/∂a for this layer (error in activation space).
    /// Returns the parameter gradients and ∂L/∂input for the previous layer.
    pub fn compute_gradients(
        &self,
        next_layer_delta: &Matrix,
        ctx: ExecutionContext,
    ) -> Result<(LayerGradients, Matrix)> {
        if !next_layer_delta.same_shape(&self.pre_neurons) {
            return Err(SkyError::shape(
                "dense layer backward",
                vec![self.pre_neurons.rows, self.pre_neurons.cols],
                vec![next_layer_delta.rows, next_layer_delta.cols],
            ));
        }
        // Use pre-activation z so that derivative(z) = σ'(z) is computed correctly
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = next_layer_delta.hadamard(&act_derivative);

        let weights = self.inputs.transpose().matmul(&layer_delta, ctx)?;
        let biases = layer_delta.sum_rows();
        let input_delta = layer_delta.matmul(&self.weights.transpose(), ctx)?;

        Ok((LayerGradients { weights, biases }, input_delta))
    }

    /// Drops the activations cached by the last training forward pass.
    pub fn clear_cache(&mut self) {
        self.inputs = Matrix::default();
        self.pre_neurons = Matrix::default();
    }

    pub fn has_cache(&self) -> bool {
        self.pre_neurons.rows > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixed_layer(activation: ActivationFunction) -> Layer {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut layer = Layer::new(2, 2, activation, &mut rng);
        layer.weights = Matrix::from_rows(vec![vec![1.0, -1.0], vec![2.0, 0.5]]).unwrap();
        layer.biases = Matrix::from_rows(vec![vec![0.5, -3.0]]).unwrap();
        layer
    }

    #[test]
    fn forward_applies_affine_map_then_activation() {
        let mut layer = fixed_layer(ActivationFunction::ReLU);
        let x = Matrix::from_rows(vec![vec![1.0, 1.0], vec![0.0, 2.0]]).unwrap();
        let out = layer.feed_from(x.clone(), ExecutionContext::Cpu).unwrap();
        // row 0: z = [3.5, -3.5]; row 1: z = [4.5, -2.0]
        assert_eq!(out.data, vec![vec![3.5, 0.0], vec![4.5, 0.0]]);
        assert_eq!(layer.infer(&x, ExecutionContext::Cpu).unwrap(), out);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut layer = fixed_layer(ActivationFunction::Identity);
        let x = Matrix::from_rows(vec![vec![0.3, -0.7], vec![1.1, 0.4]]).unwrap();
        layer.feed_from(x.clone(), ExecutionContext::Cpu).unwrap();
        // L = sum of outputs, so dL/da = 1 everywhere
        let ones = Matrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let (grads, input_delta) = layer.compute_gradients(&ones, ExecutionContext::Cpu).unwrap();

        let loss = |l: &Layer| -> f64 {
            l.infer(&x, ExecutionContext::Cpu).unwrap().data.iter().flatten().sum()
        };
        let eps = 1e-6;
        let mut bumped = layer.clone();
        bumped.weights.data[1][0] += eps;
        let numeric = (loss(&bumped) - loss(&layer)) / eps;
        assert!((numeric - grads.weights.data[1][0]).abs() < 1e-4);
        assert_eq!(grads.biases.data, vec![vec![2.0, 2.0]]);
        // dL/dx_i = sum_j w_ij
        assert_eq!(input_delta.data[0], vec![0.0, 2.5]);
    }

    #[test]
    fn backward_without_forward_is_a_shape_error() {
        let layer = fixed_layer(ActivationFunction::ReLU);
        let delta = Matrix::zeros(1, 2);
        assert!(layer.compute_gradients(&delta, ExecutionContext::Cpu).is_err());
    }

    #[test]
    fn clearing_cache_releases_activations() {
        let mut layer = fixed_layer(ActivationFunction::ReLU);
        layer.feed_from(Matrix::zeros(3, 2), ExecutionContext::Cpu).unwrap();
        assert!(layer.has_cache());
        layer.clear_cache();
        assert!(!layer.has_cache());
    }
}

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    ReLU,
    /// No non-linearity; used on the output layer so the raw Cartesian
    /// offsets can take any sign and magnitude.
    Identity,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation value.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ActivationFunction;

    #[test]
    fn relu_clamps_negatives() {
        let relu = ActivationFunction::ReLU;
        assert_eq!(relu.function(-2.0), 0.0);
        assert_eq!(relu.function(3.5), 3.5);
        assert_eq!(relu.derivative(-2.0), 0.0);
        assert_eq!(relu.derivative(3.5), 1.0);
        // torch convention: the kink itself gets a zero slope
        assert_eq!(relu.derivative(0.0), 0.0);
    }

    #[test]
    fn identity_passes_through() {
        let id = ActivationFunction::Identity;
        assert_eq!(id.function(-7.25), -7.25);
        assert_eq!(id.derivative(123.0), 1.0);
    }
}

use rand::RngCore;

use crate::config::Config;
use crate::context::ExecutionContext;
use crate::error::{Result, SkyError};
use crate::geometry::position::AzAlt;
use crate::geometry::transform::{AngleJacobian, CoordinateTransformer};
use crate::layers::dense::{Layer, LayerGradients};
use crate::math::matrix::Matrix;
use crate::model::{Regressor, SkyBatch};
use crate::network::spec::baseline_layers;
use crate::network::{LoadReport, Network, StateDict};

pub const BASELINE: &str = "baseline";

/// Maps an observation time to every body's azimuth/altitude.
///
/// The scalar time is copied into all P input slots, run through
/// P → 8 → 16 → 3P, and each consecutive triple of outputs is read as one
/// body's ECEF position in metres before the coordinate transformer turns it
/// into a sky position. Nothing in the input tells bodies apart; only the
/// weights do.
#[derive(Debug, Clone)]
pub struct PositionRegressor {
    config: Config,
    network: Network,
    transformer: CoordinateTransformer,
    jacobians: Vec<Vec<AngleJacobian>>,
}

impl PositionRegressor {
    pub fn new(config: &Config, ctx: ExecutionContext, rng: &mut dyn RngCore) -> Result<Self> {
        config.validate()?;
        let network = Network::new(&baseline_layers(config.planets), ctx, rng);
        Ok(PositionRegressor {
            config: config.clone(),
            network,
            transformer: CoordinateTransformer::from_config(config, ctx),
            jacobians: Vec::new(),
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    fn time_matrix(&self, times: &[f64]) -> Matrix {
        let p = self.config.planets;
        Matrix {
            rows: times.len(),
            cols: p,
            data: times.iter().map(|&t| vec![t; p]).collect(),
        }
    }

    /// Splits the B×3P network output into B·P Cartesian triples.
    fn bodies(&self, output: &Matrix) -> Result<Vec<[f64; 3]>> {
        let p = self.config.planets;
        if output.cols != 3 * p {
            return Err(SkyError::shape(
                "regressor output",
                vec![output.rows, p, 3],
                vec![output.rows, output.cols],
            ));
        }
        Ok(output.data.iter()
            .flat_map(|row| row.chunks_exact(3).map(|c| [c[0], c[1], c[2]]))
            .collect())
    }

    fn regroup<T: Clone>(&self, flat: Vec<T>) -> Vec<Vec<T>> {
        flat.chunks(self.config.planets).map(|c| c.to_vec()).collect()
    }
}

impl Regressor for PositionRegressor {
    fn variant(&self) -> &str {
        BASELINE
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn forward(&mut self, times: &[f64]) -> Result<SkyBatch> {
        let output = self.network.forward(self.time_matrix(times))?;
        let bodies = self.bodies(&output)?;
        let (positions, jacobians): (Vec<AzAlt>, Vec<AngleJacobian>) =
            self.transformer.convert_with_jacobian(&bodies).into_iter().unzip();
        self.jacobians = self.regroup(jacobians);
        Ok(self.regroup(positions))
    }

    fn predict(&self, times: &[f64]) -> Result<SkyBatch> {
        let output = self.network.infer(&self.time_matrix(times))?;
        let bodies = self.bodies(&output)?;
        Ok(self.regroup(self.transformer.convert(&bodies)))
    }

    fn backward(&self, position_grad: &[Vec<AzAlt>]) -> Result<Vec<LayerGradients>> {
        let p = self.config.planets;
        let batch = self.jacobians.len();
        let actual_p = position_grad.iter().map(|row| row.len()).find(|&n| n != p).unwrap_or(p);
        if position_grad.len() != batch || actual_p != p {
            return Err(SkyError::shape(
                "position gradient",
                vec![batch, p, 2],
                vec![position_grad.len(), actual_p, 2],
            ));
        }

        let data = position_grad.iter().zip(self.jacobians.iter())
            .map(|(grad_row, jac_row)| {
                grad_row.iter().zip(jac_row.iter())
                    .flat_map(|(g, j)| {
                        (0..3).map(move |axis| g.azimuth * j.azimuth[axis] + g.altitude * j.altitude[axis])
                    })
                    .collect()
            })
            .collect();
        let delta = Matrix { rows: batch, cols: 3 * p, data };
        self.network.backward(delta)
    }

    fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.network.layers
    }

    fn state_dict(&self) -> StateDict {
        self.network.state_dict()
    }

    fn load_state_dict(&mut self, dict: &StateDict) -> Result<LoadReport> {
        self.network.load_state_dict(dict)
    }

    fn release_transient(&mut self) {
        self.network.clear_cache();
        self.jacobians.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::CircularLoss;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn regressor(planets: usize, seed: u64) -> PositionRegressor {
        let config = Config { planets, ..Config::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        PositionRegressor::new(&config, ExecutionContext::Cpu, &mut rng).unwrap()
    }

    #[test]
    fn forward_yields_one_position_per_body() {
        let mut model = regressor(3, 0);
        let out = model.forward(&[0.0, 0.5, 1.0, 1.5]).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|row| row.len() == 3));
        assert_eq!(model.predict(&[0.0, 0.5, 1.0, 1.5]).unwrap(), out);
    }

    #[test]
    fn zero_weights_put_every_body_at_the_earth_centre() {
        let mut model = regressor(2, 0);
        for layer in model.layers_mut() {
            layer.weights = Matrix::zeros(layer.weights.rows, layer.weights.cols);
            layer.biases = Matrix::zeros(layer.biases.rows, layer.biases.cols);
        }
        let out = model.predict(&[123.0]).unwrap();
        let expected = model.transformer().to_sky([0.0, 0.0, 0.0]);
        assert_eq!(out, vec![vec![expected, expected]]);
    }

    #[test]
    fn zero_planets_is_a_config_error() {
        let config = Config { planets: 0, ..Config::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = PositionRegressor::new(&config, ExecutionContext::Cpu, &mut rng).unwrap_err();
        assert!(matches!(err, SkyError::Config { field: "planets", .. }));
    }

    #[test]
    fn backward_rejects_wrong_gradient_shape() {
        let mut model = regressor(2, 0);
        model.forward(&[0.0, 1.0]).unwrap();
        let grad = vec![vec![AzAlt::default(); 3]; 2];
        let err = model.backward(&grad).unwrap_err();
        match err {
            SkyError::Shape { expected, actual, .. } => {
                assert_eq!(expected, vec![2, 2, 2]);
                assert_eq!(actual, vec![2, 3, 2]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn end_to_end_gradient_matches_finite_differences() {
        // Large output-layer biases keep the bodies well away from the observer
        // so the loss surface is smooth at the probe point.
        let mut model = regressor(2, 11);
        model.layers_mut()[2].biases = Matrix::from_rows(vec![vec![
            2.0e6, -3.0e6, 5.0e6, -4.0e6, 1.0e6, -2.5e6,
        ]]).unwrap();
        let times = [0.3, -0.8, 1.7];
        let truth = vec![vec![AzAlt::new(40.0, 10.0), AzAlt::new(300.0, -25.0)]; 3];
        let loss = CircularLoss::default();

        let pred = model.forward(&times).unwrap();
        let grad = loss.gradient(&pred, &truth).unwrap();
        let grads = model.backward(&grad).unwrap();

        let eval = |m: &PositionRegressor| loss.aggregate(&m.predict(&times).unwrap(), &truth).unwrap();
        let base = eval(&model);
        let close = |numeric: f64, analytic: f64| (numeric - analytic).abs() <= 1e-12 + 1e-3 * analytic.abs();

        let mut active = 0;
        for row in 0..16 {
            let mut bumped = model.clone();
            bumped.layers_mut()[2].weights.data[row][4] += 1.0;
            let numeric = eval(&bumped) - base;
            let analytic = grads[2].weights.data[row][4];
            assert!(close(numeric, analytic), "w3[{row}][4]: numeric {numeric} vs analytic {analytic}");
            if analytic != 0.0 {
                active += 1;
            }
        }
        assert!(active > 0);

        let h = 1e-4;
        let mut bumped = model.clone();
        bumped.layers_mut()[0].biases.data[0][3] += h;
        let numeric = (eval(&bumped) - base) / h;
        let analytic = grads[0].biases.data[0][3];
        assert!(close(numeric, analytic), "b1[3]: numeric {numeric} vs analytic {analytic}");
    }

    #[test]
    fn release_transient_drops_cached_state() {
        let mut model = regressor(2, 0);
        model.forward(&[0.0]).unwrap();
        model.release_transient();
        assert!(model.backward(&[vec![AzAlt::default(); 2]]).is_err());
    }
}

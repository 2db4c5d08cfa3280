use crate::error::{Result, SkyError};
use crate::geometry::position::AzAlt;
use crate::loss::reduction::Reduction;

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Either the aggregate loss or one value per body.
#[derive(Debug, Clone, PartialEq)]
pub enum LossValue {
    Aggregate(f64),
    PerBody(Vec<f64>),
}

/// Squared distance between sin/cos embeddings of azimuth and altitude.
///
/// Each angle becomes (sin, cos), so 0° and 360° coincide and there is no jump
/// at the wrap. For one body the loss is
///   (sin a − sin a')² + (cos a − cos a')² + (sin h − sin h')² + (cos h − cos h')²
/// and its derivative with respect to an angle in degrees simplifies to
///   2·sin(a − a')·π/180.
///
/// Batches are indexed `[sample][body]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CircularLoss {
    pub reduction: Reduction,
}

fn embed(p: AzAlt) -> [f64; 4] {
    let (az_sin, az_cos) = (p.azimuth * DEG2RAD).sin_cos();
    let (alt_sin, alt_cos) = (p.altitude * DEG2RAD).sin_cos();
    [az_sin, az_cos, alt_sin, alt_cos]
}

fn squared_distance(pred: AzAlt, truth: AzAlt) -> f64 {
    let (p, t) = (embed(pred), embed(truth));
    p.iter().zip(t.iter()).map(|(a, b)| (a - b).powi(2)).sum()
}

impl CircularLoss {
    pub fn new(reduction: Reduction) -> Self {
        CircularLoss { reduction }
    }

    /// Checks both batches are [B, P] and returns (B, P).
    fn check_shapes(pred: &[Vec<AzAlt>], truth: &[Vec<AzAlt>]) -> Result<(usize, usize)> {
        let batch = pred.len();
        let bodies = pred.first().map(|row| row.len()).unwrap_or(0);
        if truth.len() != batch {
            return Err(SkyError::shape("true positions", vec![batch, bodies, 2], vec![truth.len(), bodies, 2]));
        }
        for (p, t) in pred.iter().zip(truth.iter()) {
            if p.len() != bodies {
                return Err(SkyError::shape("predicted positions", vec![batch, bodies, 2], vec![batch, p.len(), 2]));
            }
            if t.len() != bodies {
                return Err(SkyError::shape("true positions", vec![batch, bodies, 2], vec![batch, t.len(), 2]));
            }
        }
        Ok((batch, bodies))
    }

    /// Reduced loss of each body over the batch.
    pub fn per_body(&self, pred: &[Vec<AzAlt>], truth: &[Vec<AzAlt>]) -> Result<Vec<f64>> {
        let (batch, bodies) = Self::check_shapes(pred, truth)?;
        let mut sums = vec![0.0; bodies];
        for (p_row, t_row) in pred.iter().zip(truth.iter()) {
            for (body, (&p, &t)) in p_row.iter().zip(t_row.iter()).enumerate() {
                sums[body] += squared_distance(p, t);
            }
        }
        let factor = self.reduction.factor(4 * batch);
        Ok(sums.into_iter().map(|s| s * factor).collect())
    }

    /// Reduced loss over every sample and body.
    pub fn aggregate(&self, pred: &[Vec<AzAlt>], truth: &[Vec<AzAlt>]) -> Result<f64> {
        let (batch, bodies) = Self::check_shapes(pred, truth)?;
        let sum: f64 = pred.iter().zip(truth.iter())
            .flat_map(|(p_row, t_row)| p_row.iter().zip(t_row.iter()))
            .map(|(&p, &t)| squared_distance(p, t))
            .sum();
        Ok(sum * self.reduction.factor(4 * batch * bodies))
    }

    pub fn loss(&self, pred: &[Vec<AzAlt>], truth: &[Vec<AzAlt>], per_body: bool) -> Result<LossValue> {
        if per_body {
            self.per_body(pred, truth).map(LossValue::PerBody)
        } else {
            self.aggregate(pred, truth).map(LossValue::Aggregate)
        }
    }

    /// ∂aggregate/∂prediction, in loss units per degree.
    pub fn gradient(&self, pred: &[Vec<AzAlt>], truth: &[Vec<AzAlt>]) -> Result<Vec<Vec<AzAlt>>> {
        let (batch, bodies) = Self::check_shapes(pred, truth)?;
        let scale = 2.0 * DEG2RAD * self.reduction.factor(4 * batch * bodies);
        Ok(pred.iter().zip(truth.iter())
            .map(|(p_row, t_row)| {
                p_row.iter().zip(t_row.iter())
                    .map(|(p, t)| AzAlt {
                        azimuth: scale * ((p.azimuth - t.azimuth) * DEG2RAD).sin(),
                        altitude: scale * ((p.altitude - t.altitude) * DEG2RAD).sin(),
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(rows: &[&[(f64, f64)]]) -> Vec<Vec<AzAlt>> {
        rows.iter()
            .map(|row| row.iter().map(|&(az, alt)| AzAlt::new(az, alt)).collect())
            .collect()
    }

    #[test]
    fn identical_positions_cost_nothing() {
        let p = batch(&[&[(12.0, 45.0), (300.0, -20.0)]]);
        let loss = CircularLoss::default();
        assert_eq!(loss.aggregate(&p, &p).unwrap(), 0.0);
        assert_eq!(loss.per_body(&p, &p).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn full_turn_is_free() {
        let a = batch(&[&[(0.0, 33.0)]]);
        let b = batch(&[&[(360.0, 33.0)]]);
        assert!(CircularLoss::default().aggregate(&a, &b).unwrap() < 1e-24);
    }

    #[test]
    fn opposite_azimuth_costs_four() {
        // (sin, cos) of 0° and 180° are (0, 1) and (0, -1)
        let a = batch(&[&[(0.0, 0.0)]]);
        let b = batch(&[&[(180.0, 0.0)]]);
        let loss = CircularLoss::default().aggregate(&a, &b).unwrap();
        assert!((loss - 4.0).abs() < 1e-12);
    }

    #[test]
    fn per_body_sums_to_aggregate_and_mean_divides() {
        let pred = batch(&[&[(10.0, 5.0), (90.0, 0.0)], &[(200.0, -30.0), (45.0, 45.0)]]);
        let truth = batch(&[&[(20.0, 0.0), (80.0, 10.0)], &[(190.0, -40.0), (60.0, 30.0)]]);
        let sum = CircularLoss::new(Reduction::Sum);
        let bodies = sum.per_body(&pred, &truth).unwrap();
        let total = sum.aggregate(&pred, &truth).unwrap();
        assert!((bodies.iter().sum::<f64>() - total).abs() < 1e-12);

        let mean = CircularLoss::new(Reduction::Mean);
        assert!((mean.aggregate(&pred, &truth).unwrap() - total / 16.0).abs() < 1e-12);
        assert!((mean.per_body(&pred, &truth).unwrap()[1] - bodies[1] / 8.0).abs() < 1e-12);
        assert_eq!(
            mean.loss(&pred, &truth, false).unwrap(),
            LossValue::Aggregate(mean.aggregate(&pred, &truth).unwrap())
        );
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let pred = batch(&[&[(10.0, 5.0)], &[(250.0, -60.0)]]);
        let truth = batch(&[&[(350.0, 7.5)], &[(100.0, 80.0)]]);
        for reduction in [Reduction::Sum, Reduction::Mean] {
            let loss = CircularLoss::new(reduction);
            let grad = loss.gradient(&pred, &truth).unwrap();
            let h = 1e-5;
            let mut bumped = pred.clone();
            bumped[1][0].altitude += h;
            let numeric = (loss.aggregate(&bumped, &truth).unwrap() - loss.aggregate(&pred, &truth).unwrap()) / h;
            assert!((numeric - grad[1][0].altitude).abs() < 1e-6);
            let mut bumped = pred.clone();
            bumped[0][0].azimuth += h;
            let numeric = (loss.aggregate(&bumped, &truth).unwrap() - loss.aggregate(&pred, &truth).unwrap()) / h;
            assert!((numeric - grad[0][0].azimuth).abs() < 1e-6);
        }
    }

    #[test]
    fn mismatched_body_count_is_a_shape_error() {
        let pred = batch(&[&[(0.0, 0.0), (1.0, 1.0)]]);
        let truth = batch(&[&[(0.0, 0.0)]]);
        let err = CircularLoss::default().aggregate(&pred, &truth).unwrap_err();
        assert!(matches!(err, SkyError::Shape { .. }));
        let short = batch(&[]);
        assert!(CircularLoss::default().per_body(&pred, &short).is_err());
    }
}

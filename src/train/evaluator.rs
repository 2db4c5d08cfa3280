use tracing::debug;

use crate::data::{DataLoader, PlanetDataset};
use crate::error::{Result, SkyError};
use crate::loss::{CircularLoss, Reduction};
use crate::model::Regressor;

/// Inference-only passes over a dataset.
///
/// Every pass goes through `Regressor::predict`, which borrows the model
/// immutably, so no activations or Jacobians are retained.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    loss: CircularLoss,
}

impl Evaluator {
    /// An evaluator whose validation pass reduces batches with `loss`.
    pub fn new(loss: CircularLoss) -> Self {
        Evaluator { loss }
    }

    /// Sum of the aggregate batch losses and the number of samples seen.
    pub fn validation_pass(&self, model: &dyn Regressor, loader: &DataLoader) -> Result<(f64, usize)> {
        let mut loss_sum = 0.0;
        let mut samples = 0;
        loader.for_each_batch(loader.indices(), |batch| {
            let pred = model.predict(&batch.times)?;
            loss_sum += self.loss.aggregate(&pred, &batch.positions)?;
            samples += batch.len();
            Ok(())
        })?;
        Ok((loss_sum, samples))
    }

    /// Mean circular loss of each body over the whole dataset.
    ///
    /// Per-body losses are summed over every sample and divided by the sample
    /// count, whatever reduction the training loss uses.
    ///
    /// # Errors
    /// `SkyError::State` when the dataset carries a different body count than
    /// the model was built for.
    pub fn evaluate(
        &self,
        model: &dyn Regressor,
        dataset: &PlanetDataset,
        batch_size: usize,
        workers: usize,
    ) -> Result<Vec<f64>> {
        if dataset.planets() != model.planets() {
            return Err(SkyError::State(format!(
                "model predicts {} bodies but the dataset has {}",
                model.planets(),
                dataset.planets()
            )));
        }
        let loader = DataLoader::new(dataset, dataset.all_indices(), batch_size, workers)?;
        let per_body = CircularLoss::new(Reduction::Sum);

        let mut sums = vec![0.0; model.planets()];
        let mut samples = 0;
        loader.for_each_batch(loader.indices(), |batch| {
            let pred = model.predict(&batch.times)?;
            for (total, body) in sums.iter_mut().zip(per_body.per_body(&pred, &batch.positions)?) {
                *total += body;
            }
            samples += batch.len();
            Ok(())
        })?;

        debug!(samples, "evaluation pass finished");
        Ok(sums.into_iter().map(|s| s / samples as f64).collect())
    }
}

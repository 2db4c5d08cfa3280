use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::context::{seeded_rng, DATA_STREAM};
use crate::data::{DataLoader, PlanetDataset};
use crate::error::{Result, SkyError};
use crate::loss::CircularLoss;
use crate::model::Regressor;
use crate::optim::Optimizer;
use crate::train::epoch_stats::{EpochStats, SavedCheckpoint, TrainReport};
use crate::train::evaluator::Evaluator;
use crate::train::metrics::{MetricsSink, BATCH_TRAIN, EPOCH_TRAIN, EPOCH_VALID};

/// Runs the epoch loop for one model.
///
/// The trainer owns the optimiser state and the best validation loss seen so
/// far. Each epoch optimises over the training subset, runs a validation pass
/// and saves a checkpoint when the unnormalised validation sum is strictly
/// below the best so far. A NaN sum never compares below anything, so it is
/// never saved.
pub struct Trainer<S: MetricsSink> {
    config: Config,
    optimizer: Optimizer,
    loss: CircularLoss,
    best_loss: f64,
    checkpoint_path: Option<PathBuf>,
    metrics: S,
    global_batch: u64,
}

impl<S: MetricsSink> Trainer<S> {
    /// A trainer with a fresh optimiser built from `config`.
    pub fn new(config: &Config, metrics: S) -> Self {
        Trainer::with_optimizer(config, Optimizer::from_config(config), metrics)
    }

    /// Continues from existing optimiser state, e.g. one restored from a
    /// checkpoint.
    pub fn with_optimizer(config: &Config, optimizer: Optimizer, metrics: S) -> Self {
        Trainer {
            config: config.clone(),
            optimizer,
            loss: CircularLoss::new(config.reduction),
            best_loss: f64::INFINITY,
            checkpoint_path: None,
            metrics,
            global_batch: 0,
        }
    }

    /// Where improving checkpoints are written. Without a path the trainer
    /// still tracks the best loss but persists nothing.
    pub fn checkpoint_to(mut self, path: impl AsRef<Path>) -> Self {
        self.checkpoint_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn metrics(&self) -> &S {
        &self.metrics
    }

    pub fn into_metrics(self) -> S {
        self.metrics
    }

    /// Trains `model` on an 80/20 split of `dataset` for `config.epochs`
    /// epochs.
    ///
    /// The split and every pass's batch order come from the data stream of
    /// `config.seed`, so two runs from the same seed and initial parameters
    /// follow the same trajectory.
    pub fn run(&mut self, model: &mut dyn Regressor, dataset: &PlanetDataset) -> Result<TrainReport> {
        if dataset.planets() != model.planets() {
            return Err(SkyError::config(
                "planets",
                format!("model predicts {} bodies but the dataset has {}", model.planets(), dataset.planets()),
            ));
        }

        let mut rng = seeded_rng(self.config.seed, DATA_STREAM);
        let (train_idx, valid_idx) = dataset.random_split(&mut rng)?;
        let train_loader = DataLoader::new(dataset, train_idx, self.config.batch_size, self.config.workers)?;
        let valid_loader = DataLoader::new(dataset, valid_idx, self.config.batch_size, self.config.workers)?;
        let evaluator = Evaluator::new(self.loss);
        info!(
            train = train_loader.len(),
            valid = valid_loader.len(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            optimizer = ?self.optimizer.kind(),
            "starting training"
        );

        let mut report = TrainReport { best_valid_loss: self.best_loss, ..TrainReport::default() };
        for epoch in 1..=self.config.epochs {
            let t_start = Instant::now();

            let order = train_loader.pass_order(Some(&mut rng));
            let (train_sum, train_samples) = self.train_pass(model, &train_loader, &order)?;

            let (valid_sum, valid_samples) = evaluator.validation_pass(model, &valid_loader)?;

            let train_loss = train_sum / train_samples as f64;
            let valid_loss = valid_sum / valid_samples as f64;
            let epoch_step = (epoch - 1) as u64;
            self.metrics.add_scalar(EPOCH_TRAIN, train_loss, epoch_step)?;
            self.metrics.add_scalar(EPOCH_VALID, valid_loss, epoch_step)?;

            if valid_sum.is_nan() {
                warn!(epoch, "validation loss is NaN; keeping the previous checkpoint");
            }
            let checkpointed = valid_sum < self.best_loss;
            if checkpointed {
                let path = match &self.checkpoint_path {
                    Some(path) => {
                        Checkpoint::capture(model, &self.optimizer, epoch, valid_sum).save(path)?;
                        Some(path.clone())
                    }
                    None => None,
                };
                debug!(epoch, previous = self.best_loss, current = valid_sum, "validation loss improved");
                self.best_loss = valid_sum;
                report.checkpoints.push(SavedCheckpoint { epoch, valid_loss: valid_sum, path });
            }

            let stats = EpochStats {
                epoch,
                total_epochs: self.config.epochs,
                train_loss_sum: train_sum,
                train_samples,
                train_loss,
                valid_loss_sum: valid_sum,
                valid_samples,
                valid_loss,
                checkpointed,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            info!(
                epoch,
                train_loss = stats.train_loss,
                valid_loss = stats.valid_loss,
                checkpointed,
                elapsed_ms = stats.elapsed_ms,
                "epoch finished"
            );
            report.epochs.push(stats);
        }

        self.metrics.flush()?;
        report.best_valid_loss = self.best_loss;
        Ok(report)
    }

    /// One optimisation pass; returns the summed batch losses and the sample
    /// count.
    fn train_pass(&mut self, model: &mut dyn Regressor, loader: &DataLoader, order: &[usize]) -> Result<(f64, usize)> {
        let mut loss_sum = 0.0;
        let mut samples = 0;
        loader.for_each_batch(order, |batch| {
            let pred = model.forward(&batch.times)?;
            let loss = self.loss.aggregate(&pred, &batch.positions)?;
            loss_sum += loss;
            samples += batch.len();

            self.global_batch += 1;
            let normalised = loss / batch.len() as f64;
            debug!(batch = self.global_batch, loss = normalised, "train batch");
            self.metrics.add_scalar(BATCH_TRAIN, normalised, self.global_batch)?;

            let grad = self.loss.gradient(&pred, &batch.positions)?;
            let layer_grads = model.backward(&grad)?;
            self.optimizer.step(model.layers_mut(), &layer_grads);
            model.release_transient();
            Ok(())
        })?;
        Ok((loss_sum, samples))
    }
}

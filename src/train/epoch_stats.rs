use std::path::PathBuf;

use serde::{Serialize, Deserialize};

/// Per-epoch training statistics collected by `Trainer::run`.
///
/// Loss sums are the unnormalised totals the checkpoint decision compares;
/// `train_loss` and `valid_loss` are those sums divided by the sample counts,
/// matching the "Loss/Train" and "Loss/Valid" series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    pub train_loss_sum: f64,
    pub train_samples: usize,
    /// Mean training loss per sample.
    pub train_loss: f64,
    pub valid_loss_sum: f64,
    pub valid_samples: usize,
    /// Mean validation loss per sample.
    pub valid_loss: f64,
    /// Whether this epoch improved on the best validation sum and was saved.
    pub checkpointed: bool,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// A checkpoint written during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCheckpoint {
    pub epoch: usize,
    pub valid_loss: f64,
    /// `None` when the trainer has no checkpoint path and only tracks the best.
    pub path: Option<PathBuf>,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs: Vec<EpochStats>,
    /// Improvements in the order they were saved; validation sums strictly
    /// decrease along this list.
    pub checkpoints: Vec<SavedCheckpoint>,
    pub best_valid_loss: f64,
}

impl TrainReport {
    pub fn last_epoch(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }
}

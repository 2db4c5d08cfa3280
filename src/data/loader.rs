use std::sync::mpsc;
use std::thread;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::data::dataset::PlanetDataset;
use crate::error::{Result, SkyError};
use crate::geometry::position::AzAlt;

/// A collated mini-batch: `times[i]` pairs with `positions[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub times: Vec<f64>,
    pub positions: Vec<Vec<AzAlt>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Serves one subset of a dataset in mini-batches.
///
/// With `workers == 0` batches are collated on the calling thread. Otherwise a
/// scoped producer thread collates ahead of the consumer through a channel
/// bounded at `workers` batches. Either way the consumer sees the same batches
/// in the same order.
#[derive(Debug)]
pub struct DataLoader<'a> {
    dataset: &'a PlanetDataset,
    indices: Vec<usize>,
    batch_size: usize,
    workers: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a PlanetDataset, indices: Vec<usize>, batch_size: usize, workers: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SkyError::config("batch_size", "must be at least 1"));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
            return Err(SkyError::Data(format!(
                "index {bad} out of range for {} samples",
                dataset.len()
            )));
        }
        Ok(DataLoader { dataset, indices, batch_size, workers })
    }

    /// Number of samples in this subset.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Subset indices in stored order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Subset order for one pass: shuffled when an RNG is given, stored order
    /// otherwise.
    pub fn pass_order<R: Rng + ?Sized>(&self, rng: Option<&mut R>) -> Vec<usize> {
        let mut order = self.indices.clone();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        order
    }

    fn collate(&self, chunk: &[usize]) -> Batch {
        let samples = self.dataset.samples();
        Batch {
            times: chunk.iter().map(|&i| samples[i].time).collect(),
            positions: chunk.iter().map(|&i| samples[i].positions.clone()).collect(),
        }
    }

    /// Feeds `f` every batch of `order`; the last batch may be short.
    ///
    /// Stops at the first error `f` returns.
    pub fn for_each_batch<F>(&self, order: &[usize], mut f: F) -> Result<()>
    where
        F: FnMut(Batch) -> Result<()>,
    {
        if self.workers == 0 {
            for chunk in order.chunks(self.batch_size) {
                f(self.collate(chunk))?;
            }
            return Ok(());
        }

        thread::scope(|scope| {
            let (tx, rx) = mpsc::sync_channel::<Batch>(self.workers);
            scope.spawn(move || {
                for chunk in order.chunks(self.batch_size) {
                    // Receiver gone: the consumer bailed out early.
                    if tx.send(self.collate(chunk)).is_err() {
                        trace!("batch consumer hung up");
                        break;
                    }
                }
            });
            for batch in rx {
                f(batch)?;
            }
            Ok(())
        })
    }
}

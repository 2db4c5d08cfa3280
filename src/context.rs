use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// RNG stream used for parameter initialisation.
pub const INIT_STREAM: u64 = 0;
/// RNG stream used for the train/validation split and batch order.
pub const DATA_STREAM: u64 = 1;

/// A generator fully determined by `(seed, stream)`.
///
/// Separate streams keep initialisation and data ordering independent, so
/// changing one never shifts the other.
pub fn seeded_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Where numeric work runs.
///
/// Passed explicitly into constructors and hot loops. `Accelerator` spreads
/// independent rows over the rayon pool; every row is still produced by the
/// same sequential expression, so both contexts yield bit-identical numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    #[default]
    Cpu,
    Accelerator,
}

impl ExecutionContext {
    pub fn from_flag(use_accelerator: bool) -> Self {
        if use_accelerator {
            ExecutionContext::Accelerator
        } else {
            ExecutionContext::Cpu
        }
    }

    /// Evaluates `f(0..n)` and collects the results in index order.
    pub fn map_indexed<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ExecutionContext::Cpu => (0..n).map(f).collect(),
            ExecutionContext::Accelerator => (0..n).into_par_iter().map(f).collect(),
        }
    }
}

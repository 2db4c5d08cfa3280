pub mod epoch_stats;
pub mod evaluator;
pub mod metrics;
pub mod trainer;

pub use epoch_stats::{EpochStats, SavedCheckpoint, TrainReport};
pub use evaluator::Evaluator;
pub use metrics::{JsonLinesSink, MemorySink, MetricsSink, NullSink, ScalarRecord};
pub use trainer::Trainer;

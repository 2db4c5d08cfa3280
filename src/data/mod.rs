pub mod dataset;
pub mod loader;

pub use dataset::{PlanetDataset, Sample, TRAIN_FRACTION};
pub use loader::{Batch, DataLoader};

pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod geometry;
pub mod model;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod checkpoint;
pub mod results;
pub mod config;
pub mod context;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use geometry::{AzAlt, CoordinateTransformer};
pub use model::{ModelRegistry, PositionRegressor, Regressor};
pub use loss::{CircularLoss, Reduction};
pub use optim::Optimizer;
pub use data::{DataLoader, PlanetDataset, Sample};
pub use train::{Evaluator, Trainer, TrainReport};
pub use checkpoint::Checkpoint;
pub use results::update_results;
pub use config::Config;
pub use context::ExecutionContext;
pub use error::{Result, SkyError};

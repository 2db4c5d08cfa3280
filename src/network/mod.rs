pub mod network;
pub mod spec;

pub use network::{Network, StateDict, LoadReport};
pub use spec::LayerSpec;

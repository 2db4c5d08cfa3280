pub mod circular;
pub mod reduction;

pub use circular::{CircularLoss, LossValue};
pub use reduction::Reduction;

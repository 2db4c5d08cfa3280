use serde::{Serialize, Deserialize};

/// How squared components are folded into one loss value.
///
/// - `Sum`:  plain sum over batch, bodies and the four embedded components.
///         The checkpoint comparison then scales with batch size and body
///         count; this is what trained models so far were selected with.
/// - `Mean`: the same sum divided by the number of components summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
}

impl Reduction {
    /// Factor applied to a sum of `count` squared components.
    pub fn factor(&self, count: usize) -> f64 {
        match self {
            Reduction::Sum => 1.0,
            Reduction::Mean if count == 0 => 0.0,
            Reduction::Mean => 1.0 / count as f64,
        }
    }
}

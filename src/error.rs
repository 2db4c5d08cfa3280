use std::path::PathBuf;

use thiserror::Error;

/// Every failure the library can report.
///
/// Degenerate geometry (x = 0 in the longitude, cos(lat) = 0 in the height) has
/// no variant: those cases resolve to limit or sentinel values inside the
/// coordinate transformer.
#[derive(Error, Debug)]
pub enum SkyError {
    #[error("invalid configuration `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("invalid dataset: {0}")]
    Data(String),

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    Shape {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("unable to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent state: {0}")]
    State(String),

    #[error("unknown model variant `{0}`")]
    UnknownModel(String),
}

impl SkyError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SkyError::Config { field, reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SkyError::Io { path: path.into(), source }
    }

    pub fn shape(context: &'static str, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        SkyError::Shape { context, expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, SkyError>;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyError};

/// Normalised loss of each training batch, keyed by global batch index
/// counted from 1.
pub const BATCH_TRAIN: &str = "Loss/BatchTrain";
/// Normalised training loss of an epoch, keyed by 0-based epoch index.
pub const EPOCH_TRAIN: &str = "Loss/Train";
/// Normalised validation loss of an epoch, keyed by 0-based epoch index.
pub const EPOCH_VALID: &str = "Loss/Valid";

/// One point of a named scalar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub step: u64,
    pub value: f64,
}

/// Destination for named scalar series.
pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn add_scalar(&mut self, _tag: &str, _value: f64, _step: u64) -> Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<ScalarRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// `(step, value)` pairs of one series, in emission order.
    pub fn series(&self, tag: &str) -> Vec<(u64, f64)> {
        self.records.iter()
            .filter(|r| r.tag == tag)
            .map(|r| (r.step, r.value))
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        self.records.push(ScalarRecord { tag: tag.to_string(), step, value });
        Ok(())
    }
}

/// Appends one JSON object per scalar to a file.
///
/// Non-finite values are written as `null`.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SkyError::io(&path, e))?;
        Ok(JsonLinesSink { path, writer: BufWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        let record = ScalarRecord { tag: tag.to_string(), step, value };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n").map_err(|e| SkyError::io(&self.path, e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| SkyError::io(&self.path, e))
    }
}

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::checkpoint::write_json_atomically;
use crate::error::{Result, SkyError};

/// Per-body mean losses keyed by run identifier.
pub type ResultsTable = BTreeMap<String, Vec<f64>>;

/// Reads the results file; a missing file is an empty table.
pub fn read_results(path: impl AsRef<Path>) -> Result<ResultsTable> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ResultsTable::new()),
        Err(e) => Err(SkyError::io(path, e)),
    }
}

/// Inserts or replaces `run_id` and rewrites the whole file.
///
/// Returns the table as written.
pub fn update_results(path: impl AsRef<Path>, run_id: &str, losses: &[f64]) -> Result<ResultsTable> {
    let path = path.as_ref();
    let mut table = read_results(path)?;
    table.insert(run_id.to_string(), losses.to_vec());
    write_json_atomically(path, &table)?;
    info!(path = %path.display(), run_id, runs = table.len(), "updated results");
    Ok(table)
}

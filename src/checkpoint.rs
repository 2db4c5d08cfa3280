use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::{seeded_rng, ExecutionContext, INIT_STREAM};
use crate::error::{Result, SkyError};
use crate::model::{ModelRegistry, Regressor};
use crate::network::StateDict;
use crate::optim::Optimizer;

/// Current on-disk schema.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A trained model's parameters, the optimiser state that produced them and
/// the configuration of the run, saved as one JSON record.
///
/// New fields must carry `#[serde(default)]` so older records keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Registry name of the variant the parameters belong to.
    pub model: String,
    pub parameters: StateDict,
    pub optimizer: Optimizer,
    pub config: Config,
    /// Epoch whose validation pass produced this checkpoint.
    #[serde(default)]
    pub epoch: usize,
    /// Unnormalised validation loss of that epoch.
    #[serde(default)]
    pub valid_loss: f64,
}

#[derive(Deserialize)]
struct VersionTag {
    version: u32,
}

impl Checkpoint {
    /// Snapshots `model` and `optimizer`.
    pub fn capture(model: &dyn Regressor, optimizer: &Optimizer, epoch: usize, valid_loss: f64) -> Self {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            model: model.variant().to_string(),
            parameters: model.state_dict(),
            optimizer: optimizer.clone(),
            config: model.config().clone(),
            epoch,
            valid_loss,
        }
    }

    /// Writes the checkpoint so that `path` holds either the previous file
    /// or the complete new one, never a partial write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_atomically(path.as_ref(), self)?;
        info!(path = %path.as_ref().display(), epoch = self.epoch, valid_loss = self.valid_loss, "saved checkpoint");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SkyError::io(path, e))?;
        let tag: VersionTag = serde_json::from_str(&json)?;
        if tag.version > CHECKPOINT_VERSION {
            return Err(SkyError::State(format!(
                "checkpoint {} has version {}, newest readable is {CHECKPOINT_VERSION}",
                path.display(),
                tag.version
            )));
        }
        Ok(serde_json::from_str(&json)?)
    }

    /// Where the stored run did its numeric work.
    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::from_flag(self.config.accelerator)
    }

    /// Rebuilds the model this checkpoint describes.
    ///
    /// The stored config wins over anything the caller holds. Parameters load
    /// permissively: names missing on either side are logged and skipped,
    /// while a shape disagreement fails.
    pub fn restore(&self, registry: &ModelRegistry, ctx: ExecutionContext) -> Result<Box<dyn Regressor>> {
        let config = Config { model: self.model.clone(), ..self.config.clone() };
        let mut rng = seeded_rng(config.seed, INIT_STREAM);
        let mut model = registry.build(&config, ctx, &mut rng)?;
        let report = model.load_state_dict(&self.parameters)?;
        if !report.is_clean() {
            warn!(missing = ?report.missing, unexpected = ?report.unexpected, "checkpoint parameters did not line up");
        }
        Ok(model)
    }
}

/// Serialises `value` into a temporary file beside `path`, then renames it
/// over `path`.
pub(crate) fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| SkyError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(|e| SkyError::io(tmp.path(), e))?;
    }
    tmp.as_file().sync_all().map_err(|e| SkyError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| SkyError::io(path, e.error))?;
    Ok(())
}

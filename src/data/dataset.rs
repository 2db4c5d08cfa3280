use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SkyError};
use crate::geometry::position::AzAlt;

/// Share of samples that go to the training subset.
pub const TRAIN_FRACTION: f64 = 0.8;

/// One observation: a time and every body's true azimuth/altitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    #[serde(rename = "pos")]
    pub positions: Vec<AzAlt>,
}

/// Validated samples with a fixed body count.
#[derive(Debug, Clone)]
pub struct PlanetDataset {
    samples: Vec<Sample>,
    planets: usize,
}

impl PlanetDataset {
    /// Validates `samples` against the configured body count.
    pub fn new(samples: Vec<Sample>, planets: usize) -> Result<Self> {
        let dataset = Self::from_samples(samples)?;
        if dataset.planets != planets {
            return Err(SkyError::config(
                "planets",
                format!("configured {planets} bodies but the dataset has {}", dataset.planets),
            ));
        }
        Ok(dataset)
    }

    /// Validates `samples`, taking the body count from the first sample.
    ///
    /// Azimuths are folded into [0, 360); altitudes must already lie in
    /// [-90, 90].
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| SkyError::Data("dataset contains no samples".into()))?;
        let width = first.positions.len();

        let mut cleaned = Vec::with_capacity(samples.len());
        for (i, sample) in samples.into_iter().enumerate() {
            if sample.positions.len() != width {
                return Err(SkyError::Data(format!(
                    "sample {i} has {} bodies, sample 0 has {width}",
                    sample.positions.len()
                )));
            }
            if !sample.time.is_finite() {
                return Err(SkyError::Data(format!("sample {i} has a non-finite time")));
            }
            let mut positions = Vec::with_capacity(width);
            for (body, p) in sample.positions.into_iter().enumerate() {
                if !p.azimuth.is_finite() {
                    return Err(SkyError::Data(format!("sample {i}, body {body}: azimuth is not finite")));
                }
                if !(-90.0..=90.0).contains(&p.altitude) {
                    return Err(SkyError::Data(format!(
                        "sample {i}, body {body}: altitude {} outside [-90, 90]",
                        p.altitude
                    )));
                }
                positions.push(p.normalized());
            }
            cleaned.push(Sample { time: sample.time, positions });
        }

        Ok(PlanetDataset { samples: cleaned, planets: width })
    }

    fn parse(json: &str) -> Result<Vec<Sample>> {
        serde_json::from_str(json).map_err(|e| SkyError::Data(format!("malformed dataset: {e}")))
    }

    pub fn from_json_str(json: &str, planets: usize) -> Result<Self> {
        Self::new(Self::parse(json)?, planets)
    }

    /// Reads a dataset file, requiring exactly `planets` bodies per sample.
    pub fn load(path: impl AsRef<Path>, planets: usize) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SkyError::io(path, e))?;
        let dataset = Self::from_json_str(&json, planets)?;
        info!(path = %path.display(), samples = dataset.len(), planets, "loaded dataset");
        Ok(dataset)
    }

    /// Reads a dataset file with whatever body count it carries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SkyError::io(path, e))?;
        let dataset = Self::from_samples(Self::parse(&json)?)?;
        info!(path = %path.display(), samples = dataset.len(), planets = dataset.planets, "opened dataset");
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn planets(&self) -> usize {
        self.planets
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Every index, in file order.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.samples.len()).collect()
    }

    /// Random 80/20 partition of the sample indices.
    ///
    /// The training subset gets floor(0.8·n) samples; both subsets must end
    /// up non-empty.
    pub fn random_split<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Vec<usize>, Vec<usize>)> {
        let n = self.samples.len();
        let train_size = (n as f64 * TRAIN_FRACTION) as usize;
        if train_size == 0 || train_size == n {
            return Err(SkyError::Data(format!(
                "{n} samples cannot be split into non-empty training and validation sets"
            )));
        }
        let mut indices = self.all_indices();
        indices.shuffle(rng);
        let valid = indices.split_off(train_size);
        Ok((indices, valid))
    }
}

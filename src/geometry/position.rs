use serde::{Deserialize, Serialize};

/// One body's place in the observer's sky, in degrees.
///
/// Serialised as the two-element array `[azimuth, altitude]`, the layout the
/// dataset files use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct AzAlt {
    pub azimuth: f64,
    pub altitude: f64,
}

impl AzAlt {
    pub fn new(azimuth: f64, altitude: f64) -> Self {
        AzAlt { azimuth, altitude }
    }

    /// Same direction with the azimuth folded into [0, 360).
    pub fn normalized(self) -> Self {
        AzAlt { azimuth: self.azimuth.rem_euclid(360.0), altitude: self.altitude }
    }
}

impl From<[f64; 2]> for AzAlt {
    fn from(pair: [f64; 2]) -> Self {
        AzAlt { azimuth: pair[0], altitude: pair[1] }
    }
}

impl From<AzAlt> for [f64; 2] {
    fn from(p: AzAlt) -> Self {
        [p.azimuth, p.altitude]
    }
}

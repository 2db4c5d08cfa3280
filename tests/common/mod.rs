#![allow(dead_code)]

use ferrite_sky::config::Config;
use ferrite_sky::data::{PlanetDataset, Sample};
use ferrite_sky::geometry::AzAlt;

/// Small run settings shared by the integration tests.
pub fn small_config(planets: usize) -> Config {
    Config {
        planets,
        epochs: 1,
        batch_size: 4,
        learning_rate: 1e-3,
        workers: 0,
        seed: 7,
        ..Config::default()
    }
}

/// `n` samples of `planets` bodies drifting steadily across the sky.
pub fn synthetic_dataset(n: usize, planets: usize) -> PlanetDataset {
    let samples = (0..n)
        .map(|i| {
            let t = i as f64;
            Sample {
                time: t / 10.0,
                positions: (0..planets)
                    .map(|body| {
                        let rate = 12.0 * (body + 1) as f64;
                        AzAlt::new((rate * t) % 360.0, 40.0 * (0.3 * t + body as f64).sin())
                    })
                    .collect(),
            }
        })
        .collect();
    PlanetDataset::new(samples, planets).expect("synthetic dataset is valid")
}

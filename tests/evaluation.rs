mod common;

use ferrite_sky::checkpoint::Checkpoint;
use ferrite_sky::config::Config;
use ferrite_sky::context::{seeded_rng, ExecutionContext, INIT_STREAM};
use ferrite_sky::data::{PlanetDataset, Sample};
use ferrite_sky::error::SkyError;
use ferrite_sky::math::Matrix;
use ferrite_sky::model::{ModelRegistry, Regressor};
use ferrite_sky::optim::Optimizer;
use ferrite_sky::results::{read_results, update_results};
use ferrite_sky::train::Evaluator;

use crate::common::{small_config, synthetic_dataset};

fn zeroed(config: &Config) -> Box<dyn Regressor> {
    let mut model = ModelRegistry::with_defaults()
        .build(config, ExecutionContext::Cpu, &mut seeded_rng(config.seed, INIT_STREAM))
        .unwrap();
    for layer in model.layers_mut() {
        layer.weights = Matrix::zeros(layer.weights.rows, layer.weights.cols);
        layer.biases = Matrix::zeros(layer.biases.rows, layer.biases.cols);
    }
    model
}

#[test]
fn zero_weight_model_scores_zero_on_its_own_predictions() {
    let config = small_config(3);
    let model = zeroed(&config);
    let times = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
    let predicted = model.predict(&times).unwrap();
    let samples = times.iter().zip(predicted)
        .map(|(&time, positions)| Sample { time, positions })
        .collect();
    let dataset = PlanetDataset::new(samples, 3).unwrap();

    let losses = Evaluator::default().evaluate(model.as_ref(), &dataset, 3, 0).unwrap();
    assert_eq!(losses, vec![0.0; 3]);
}

#[test]
fn evaluating_a_dataset_with_another_body_count_fails() {
    let model = zeroed(&small_config(2));
    let dataset = synthetic_dataset(5, 4);
    let err = Evaluator::default().evaluate(model.as_ref(), &dataset, 2, 0).unwrap_err();
    assert!(matches!(err, SkyError::State(_)));
}

#[test]
fn loaded_checkpoint_brings_its_own_config() {
    let stored = Config { latitude: -33.9, longitude: 151.2, altitude: 58.0, ..small_config(2) };
    let model = zeroed(&stored);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.json");
    Checkpoint::capture(model.as_ref(), &Optimizer::from_config(&stored), 1, 0.5).save(&path).unwrap();

    // The caller's settings disagree with the stored ones and are ignored.
    let caller = Config { planets: 5, latitude: 10.0, ..Config::default() };
    let ckpt = Checkpoint::load(&path).unwrap();
    assert_ne!(ckpt.config, caller);
    let restored = ckpt.restore(&ModelRegistry::with_defaults(), ExecutionContext::Cpu).unwrap();
    assert_eq!(restored.config(), &stored);
    assert_eq!(restored.predict(&[1.0]).unwrap(), model.predict(&[1.0]).unwrap());
}

#[test]
fn evaluation_results_accumulate_by_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    let model = zeroed(&small_config(2));
    let dataset = synthetic_dataset(6, 2);
    let losses = Evaluator::default().evaluate(model.as_ref(), &dataset, 4, 1).unwrap();
    assert_eq!(losses.len(), 2);

    update_results(&path, "baseline:zero", &losses).unwrap();
    update_results(&path, "baseline:other", &[1.0, 2.0]).unwrap();
    let table = read_results(&path).unwrap();
    assert_eq!(table["baseline:zero"], losses);
    assert_eq!(table.len(), 2);
}

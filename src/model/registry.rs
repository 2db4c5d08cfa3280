use std::collections::BTreeMap;

use rand::RngCore;
use tracing::debug;

use crate::config::Config;
use crate::context::ExecutionContext;
use crate::error::{Result, SkyError};
use crate::model::regressor::{PositionRegressor, BASELINE};
use crate::model::Regressor;

/// Builds a fresh, randomly initialised model variant.
pub type RegressorFactory = fn(&Config, ExecutionContext, &mut dyn RngCore) -> Result<Box<dyn Regressor>>;

/// Model variants by name, resolved once when a run starts.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    factories: BTreeMap<String, RegressorFactory>,
}

fn baseline(config: &Config, ctx: ExecutionContext, rng: &mut dyn RngCore) -> Result<Box<dyn Regressor>> {
    Ok(Box::new(PositionRegressor::new(config, ctx, rng)?))
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ModelRegistry::default()
    }

    /// Registry holding every variant this crate ships.
    pub fn with_defaults() -> Self {
        let mut registry = ModelRegistry::new();
        registry.register(BASELINE, baseline);
        registry
    }

    /// Adds or replaces a variant.
    pub fn register(&mut self, name: &str, factory: RegressorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }

    /// Builds the variant named by `config.model`.
    pub fn build(
        &self,
        config: &Config,
        ctx: ExecutionContext,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Regressor>> {
        let factory = self.factories
            .get(&config.model)
            .ok_or_else(|| SkyError::UnknownModel(config.model.clone()))?;
        debug!(model = %config.model, planets = config.planets, ?ctx, "building regressor");
        factory(config, ctx, rng)
    }
}

//! ferrite-sky launcher
//!
//! Trains a position regressor on a planet dataset, or evaluates a saved
//! checkpoint and records its per-body losses.
//!
//! # Exit codes
//! - 0: success
//! - 1: I/O, checkpoint or numeric failure during the run
//! - 2: bad configuration or dataset, rejected before any work starts

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use ferrite_sky::checkpoint::Checkpoint;
use ferrite_sky::config::{Config, OptimizerKind};
use ferrite_sky::context::{seeded_rng, ExecutionContext, INIT_STREAM};
use ferrite_sky::data::PlanetDataset;
use ferrite_sky::error::{Result, SkyError};
use ferrite_sky::loss::Reduction;
use ferrite_sky::model::ModelRegistry;
use ferrite_sky::results::update_results;
use ferrite_sky::train::{Evaluator, JsonLinesSink, Trainer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OptimizerArg {
    Adam,
    Sgd,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(arg: OptimizerArg) -> Self {
        match arg {
            OptimizerArg::Adam => OptimizerKind::Adam,
            OptimizerArg::Sgd => OptimizerKind::Sgd,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReductionArg {
    Sum,
    Mean,
}

impl From<ReductionArg> for Reduction {
    fn from(arg: ReductionArg) -> Self {
        match arg {
            ReductionArg::Sum => Reduction::Sum,
            ReductionArg::Mean => Reduction::Mean,
        }
    }
}

/// Predict planet sky positions from time with a small regression network
#[derive(Parser, Debug)]
#[command(name = "ferrite-sky")]
#[command(version)]
#[command(about = "Train or evaluate a planet position regressor")]
struct Cli {
    /// Dataset file (JSON array of {"time", "pos"} samples)
    #[arg(long, default_value = "data/aryabata.json")]
    data: PathBuf,

    /// Registered model variant
    #[arg(long, default_value = "baseline")]
    model: String,

    /// Checkpoint directory; `{model}` expands to the variant name
    #[arg(long, default_value = "exp/model:{model}")]
    dout: String,

    /// Metrics directory; `{model}` expands to the variant name
    #[arg(long, default_value = "runs/model:{model}")]
    writer: String,

    /// Spread numeric work over all cores (a loaded checkpoint keeps its own)
    #[arg(long)]
    gpu: bool,

    /// Batches collated ahead of the training loop (0 = inline; a loaded checkpoint keeps its own)
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Number of planets
    #[arg(long, default_value_t = 5)]
    planet: usize,

    /// Number of epochs
    #[arg(long, default_value_t = 20)]
    epoch: usize,

    /// Size of batches
    #[arg(long, default_value_t = 512)]
    batch: usize,

    /// Optimizer learning rate
    #[arg(long, default_value_t = 1e-4)]
    lr: f64,

    /// Observer latitude in degrees
    #[arg(long, default_value_t = 78.9629, allow_negative_numbers = true)]
    latitude: f64,

    /// Observer longitude in degrees
    #[arg(long, alias = "longtitude", default_value_t = 20.5937, allow_negative_numbers = true)]
    longitude: f64,

    /// Observer altitude in metres
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    alt: f64,

    /// Seed for initialisation, the split and batch order
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = OptimizerArg::Adam)]
    optimizer: OptimizerArg,

    /// Loss reduction over batch and bodies
    #[arg(long, value_enum, default_value_t = ReductionArg::Sum)]
    reduction: ReductionArg,

    /// Evaluate the checkpoint given by --load instead of training
    #[arg(long)]
    eval: bool,

    /// Checkpoint to evaluate, or to resume training from
    #[arg(long)]
    load: Option<PathBuf>,

    /// Evaluation results file
    #[arg(long, default_value = "results.json")]
    results: PathBuf,

    /// Key for this run in the results file (defaults to the checkpoint path)
    #[arg(long)]
    run_id: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            planets: self.planet,
            epochs: self.epoch,
            batch_size: self.batch,
            learning_rate: self.lr,
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.alt,
            accelerator: self.gpu,
            workers: self.workers,
            seed: self.seed,
            model: self.model.clone(),
            optimizer: self.optimizer.into(),
            reduction: self.reduction.into(),
        }
    }
}

fn expand(template: &str, model: &str) -> PathBuf {
    PathBuf::from(template.replace("{model}", model))
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| SkyError::io(path, e))
}

fn exit_code(err: &SkyError) -> u8 {
    match err {
        SkyError::Config { .. } | SkyError::Data(_) | SkyError::UnknownModel(_) => 2,
        _ => 1,
    }
}

fn train(cli: &Cli) -> Result<()> {
    let registry = ModelRegistry::with_defaults();

    let (config, mut model, optimizer) = match &cli.load {
        Some(path) => {
            let ckpt = Checkpoint::load(path)?;
            info!(path = %path.display(), epoch = ckpt.epoch, "resuming from checkpoint");
            let model = ckpt.restore(&registry, ckpt.execution_context())?;
            (ckpt.config.clone(), model, Some(ckpt.optimizer))
        }
        None => {
            let config = cli.config();
            config.validate()?;
            let ctx = ExecutionContext::from_flag(config.accelerator);
            let model = registry.build(&config, ctx, &mut seeded_rng(config.seed, INIT_STREAM))?;
            (config, model, None)
        }
    };

    let dataset = PlanetDataset::load(&cli.data, config.planets)?;

    let dout = expand(&cli.dout, &config.model);
    let writer = expand(&cli.writer, &config.model);
    create_dir(&dout)?;
    create_dir(&writer)?;

    let sink = JsonLinesSink::create(writer.join("metrics.jsonl"))?;
    let mut trainer = match optimizer {
        Some(opt) => Trainer::with_optimizer(&config, opt, sink),
        None => Trainer::new(&config, sink),
    }
    .checkpoint_to(dout.join("best.json"));

    let report = trainer.run(model.as_mut(), &dataset)?;
    info!(
        best_valid_loss = report.best_valid_loss,
        checkpoints = report.checkpoints.len(),
        "training finished"
    );
    Ok(())
}

fn evaluate(cli: &Cli) -> Result<()> {
    let path = cli.load.as_ref()
        .ok_or_else(|| SkyError::config("load", "--eval needs a checkpoint to evaluate"))?;
    let ckpt = Checkpoint::load(path)?;
    let config = &ckpt.config;
    let model = ckpt.restore(&ModelRegistry::with_defaults(), ckpt.execution_context())?;

    let dataset = PlanetDataset::open(&cli.data)?;
    let losses = Evaluator::default().evaluate(model.as_ref(), &dataset, config.batch_size, config.workers)?;
    for (body, loss) in losses.iter().enumerate() {
        println!("planet {body}: {loss:.6}");
    }

    let run_id = cli.run_id.clone().unwrap_or_else(|| path.display().to_string());
    update_results(&cli.results, &run_id, &losses)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let outcome = if cli.eval { evaluate(&cli) } else { train(&cli) };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "run failed");
            ExitCode::from(exit_code(&err))
        }
    }
}

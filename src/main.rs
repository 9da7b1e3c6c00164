use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};

use convtrain::{
    arch::{Model, Sequential},
    checkpoint,
    configs::RunConfig,
    dataset::{DataLoader, InMemoryDataset, cifar},
    optimization::LrScheduler,
    training::{self, RankedExample, Ranking, Trainer},
};

/// Train, test and inspect a convolutional classifier on CIFAR-10.
#[derive(Parser, Debug)]
#[command(name = "convtrain", version, about)]
struct Args {
    /// Directory holding the CIFAR-10 binary batches
    #[arg(short, long, global = true, default_value = "data/cifar-10-batches-bin")]
    data: PathBuf,

    /// JSON run config, defaults are used for anything it leaves out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a fresh model, then evaluate it on the test set
    Train {
        /// Where to save the trained parameters
        #[arg(long, default_value = "model.ckpt")]
        checkpoint: PathBuf,

        /// Where to write the per-epoch history as JSON
        #[arg(long)]
        history: Option<PathBuf>,

        /// Overrides the amount of epochs of the config
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Evaluate a trained model on the test set
    Test {
        #[arg(long, default_value = "model.ckpt")]
        checkpoint: PathBuf,
    },

    /// Split the test set by whether a trained model classifies it correctly
    Rank {
        #[arg(long, default_value = "model.ckpt")]
        checkpoint: PathBuf,

        /// Amount of least confident errors to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => RunConfig::default(),
    };

    let (train_set, test_set) = cifar::load_cifar10(&args.data)
        .with_context(|| format!("failed to load CIFAR-10 from {}", args.data.display()))?;
    info!(
        train = train_set.len(),
        test = test_set.len();
        "loaded dataset"
    );

    match args.command {
        Command::Train {
            checkpoint,
            history,
            epochs,
        } => train(config, &train_set, &test_set, &checkpoint, history, epochs),
        Command::Test { checkpoint } => {
            let model = restore(&config, &checkpoint)?;
            let accuracy = training::test(&model, &test_set, config.training.batch_size)?;
            info!("Test accuracy: {accuracy:.2}");
            Ok(())
        }
        Command::Rank { checkpoint, top } => {
            let model = restore(&config, &checkpoint)?;
            rank(&model, &test_set, config.training.batch_size, top)
        }
    }
}

fn train(
    mut config: RunConfig,
    train_set: &InMemoryDataset,
    test_set: &InMemoryDataset,
    checkpoint_path: &Path,
    history_path: Option<PathBuf>,
    epochs: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }

    let mut model = config.model.build(config.training.seed)?;
    let mut optimizer = config.optimizer.build(model.size());
    let mut scheduler = config
        .scheduler
        .clone()
        .map(|policy| LrScheduler::for_optimizer(policy, &*optimizer));

    info!(
        params = model.size(),
        epochs = config.training.epochs;
        "training"
    );

    let mut trainer = Trainer::new(config.training);
    let result = trainer.train(&mut model, &mut optimizer, train_set, scheduler.as_mut());

    let history = match result {
        Ok(history) => history,
        Err(failure) => {
            if let Some(path) = &history_path {
                if let Err(e) = failure.history.write_json(path) {
                    warn!("failed to write the partial history: {e}");
                }
            }
            return Err(failure.into());
        }
    };

    if let Some(path) = &history_path {
        history
            .write_json(path)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
    }

    checkpoint::save(checkpoint_path, model.params())
        .with_context(|| format!("failed to save {}", checkpoint_path.display()))?;
    info!("saved parameters to {}", checkpoint_path.display());

    let accuracy = training::test(&model, test_set, config.training.batch_size)?;
    info!("Test accuracy: {accuracy:.2}");

    Ok(())
}

fn restore(config: &RunConfig, path: &Path) -> anyhow::Result<Sequential> {
    let mut model = config.model.build(config.training.seed)?;
    checkpoint::restore(&mut model, path)
        .with_context(|| format!("failed to restore {}", path.display()))?;
    Ok(model)
}

fn rank(
    model: &Sequential,
    dataset: &InMemoryDataset,
    batch_size: usize,
    top: usize,
) -> anyhow::Result<()> {
    let Some(batch_size) = std::num::NonZeroUsize::new(batch_size) else {
        bail!("batch size must be greater than zero");
    };

    let mut loader = DataLoader::sequential(dataset, batch_size);
    let ranking = training::rank(model, loader.iter())?;

    println!(
        "{} examples: {} correct, {} errors",
        ranking.total(),
        ranking.good.len(),
        ranking.errors.len()
    );

    let mean = |examples: &[RankedExample]| match Ranking::mean_score(examples) {
        Some(score) => format!("{score:.4}"),
        None => "n/a".to_string(),
    };
    println!("mean true-class score of correct: {}", mean(&ranking.good));
    println!("mean true-class score of errors:  {}", mean(&ranking.errors));

    for example in ranking.least_confident_errors(top) {
        println!(
            "score {:.4}: {} predicted as {}",
            example.score,
            class_name(example.target),
            class_name(example.prediction)
        );
    }

    Ok(())
}

fn class_name(class: usize) -> String {
    match cifar::CLASS_NAMES.get(class) {
        Some(name) => name.to_string(),
        None => format!("class {class}"),
    }
}

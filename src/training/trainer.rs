use std::{
    error::Error,
    fmt::{self, Display},
    num::NonZeroUsize,
    time::Instant,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{EpochRecord, History, LogProgress, Progress, evaluate, run_epoch};
use crate::{
    MlErr, Result,
    arch::{Model, loss::CrossEntropy},
    dataset::{DataLoader, InMemoryDataset},
    optimization::{LrScheduler, Optimizer},
};

/// Parameters of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the dataset used for training, the rest is used for validation.
    pub train_split: f32,
    /// Seeds both the train/validation split and the shuffling of the training batches.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            train_split: 0.8,
            seed: 42,
        }
    }
}

/// A training run that stopped early, together with the epochs it completed.
#[derive(Debug)]
pub struct TrainingFailure {
    pub history: History,
    pub error: MlErr,
}

impl Display for TrainingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "training failed after {} epochs: {}",
            self.history.len(),
            self.error
        )
    }
}

impl Error for TrainingFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Runs a fixed amount of epochs, validating after each one.
pub struct Trainer<P = LogProgress> {
    config: TrainConfig,
    progress: P,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self {
            config,
            progress: LogProgress,
        }
    }
}

impl<P: Progress> Trainer<P> {
    /// Replaces the sink notified after every epoch.
    pub fn with_progress<Q: Progress>(self, progress: Q) -> Trainer<Q> {
        Trainer {
            config: self.config,
            progress,
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Trains `model` on `dataset` for `epochs` epochs.
    ///
    /// The dataset is split once into a training and a validation subset. Every epoch makes one
    /// shuffled pass over the training subset, then evaluates the model on both subsets and
    /// appends the result to the history. With a `train_split` of 1 there is nothing to validate
    /// and the validation metrics are recorded as `None`.
    ///
    /// # Errors
    /// Any error stops the run. The returned `TrainingFailure` keeps the epochs completed before
    /// it.
    pub fn train<M, O>(
        &mut self,
        model: &mut M,
        optimizer: &mut O,
        dataset: &InMemoryDataset,
        scheduler: Option<&mut LrScheduler>,
    ) -> std::result::Result<History, TrainingFailure>
    where
        M: Model + ?Sized,
        O: Optimizer + ?Sized,
    {
        let mut history = History::new();

        match self.run(model, optimizer, dataset, scheduler, &mut history) {
            Ok(()) => Ok(history),
            Err(error) => Err(TrainingFailure { history, error }),
        }
    }

    fn run<M, O>(
        &mut self,
        model: &mut M,
        optimizer: &mut O,
        dataset: &InMemoryDataset,
        mut scheduler: Option<&mut LrScheduler>,
        history: &mut History,
    ) -> Result<()>
    where
        M: Model + ?Sized,
        O: Optimizer + ?Sized,
    {
        let TrainConfig {
            epochs,
            batch_size,
            train_split,
            seed,
        } = self.config;

        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| MlErr::invalid_input("batch size must be greater than zero"))?;

        let (train, valid) = dataset.split(train_split, seed)?;
        if train.is_empty() {
            return Err(MlErr::invalid_input("the training split is empty"));
        }
        if valid.is_empty() {
            warn!("the validation split is empty, validation metrics won't be computed");
        }

        let mut train_loader = DataLoader::shuffled(&train, batch_size, seed);
        let mut train_eval_loader = DataLoader::sequential(&train, batch_size);
        let mut valid_loader = DataLoader::sequential(&valid, batch_size);

        for epoch in 0..epochs {
            let start = Instant::now();
            let stats = run_epoch(
                &CrossEntropy,
                model,
                optimizer,
                scheduler.as_deref_mut(),
                train_loader.iter(),
            )?;
            let elapsed = start.elapsed();
            debug!(
                epoch = epoch,
                batches = stats.batches(),
                samples = stats.samples();
                "epoch trained"
            );

            let train_metrics = evaluate(&*model, train_eval_loader.iter())?;
            let val_metrics = if valid_loader.is_empty() {
                None
            } else {
                Some(evaluate(&*model, valid_loader.iter())?)
            };

            let record = EpochRecord {
                epoch,
                train_accuracy: train_metrics.accuracy,
                train_loss: train_metrics.loss,
                val_accuracy: val_metrics.map(|m| m.accuracy),
                val_loss: val_metrics.map(|m| m.loss),
                learning_rate: optimizer.learning_rate(),
            };

            history.push(record.clone());
            self.progress.on_epoch(&record, elapsed);
        }

        Ok(())
    }
}

mod epoch;
mod evaluator;
mod history;
mod progress;
mod ranking;
mod stats;
mod test_runner;
mod trainer;

pub use epoch::run_epoch;
pub use evaluator::{Metrics, evaluate};
pub use history::{EpochRecord, History};
pub use progress::{LogProgress, Progress};
pub use ranking::{RankedExample, Ranking, rank};
pub use stats::StepStats;
pub use test_runner::test;
pub use trainer::{TrainConfig, Trainer, TrainingFailure};

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use super::ModelConfig;
use crate::{
    MlErr, Result,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer, SchedulePolicy},
    training::TrainConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    GradientDescent { lr: f32 },
    GradientDescentWithMomentum { lr: f32, mu: f32 },
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::GradientDescent { lr: 0.01 }
    }
}

impl OptimizerConfig {
    /// Builds the optimizer for a model with `len` parameters.
    pub fn build(self, len: usize) -> Box<dyn Optimizer> {
        match self {
            Self::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
            Self::GradientDescentWithMomentum { lr, mu } => {
                Box::new(GradientDescentWithMomentum::new(len, lr, mu))
            }
            Self::Adam { lr, b1, b2, eps } => Box::new(Adam::new(len, lr, b1, b2, eps)),
        }
    }
}

/// Everything a training run needs besides the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    /// Learning rate policy, stepped once per epoch. No scheduler if missing.
    pub scheduler: Option<SchedulePolicy>,
    pub training: TrainConfig,
}

impl RunConfig {
    /// Reads a JSON run config. Missing fields take their default value.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| MlErr::invalid_input(e.to_string()))
    }
}

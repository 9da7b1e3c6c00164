mod model;
mod training;

pub use model::{LayerConfig, ModelConfig};
pub use training::{OptimizerConfig, RunConfig};

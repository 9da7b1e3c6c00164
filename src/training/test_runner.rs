use std::num::NonZeroUsize;

use log::info;

use super::evaluate;
use crate::{MlErr, Result, arch::Model, dataset::{DataLoader, InMemoryDataset}};

/// Evaluates `model` on the whole of `dataset`, in dataset order, and returns its accuracy as a
/// percentage.
pub fn test<M>(model: &M, dataset: &InMemoryDataset, batch_size: usize) -> Result<f32>
where
    M: Model + ?Sized,
{
    let batch_size = NonZeroUsize::new(batch_size)
        .ok_or_else(|| MlErr::invalid_input("batch size must be greater than zero"))?;

    let mut loader = DataLoader::sequential(dataset, batch_size);
    let metrics = evaluate(model, loader.iter())?;
    info!(examples = dataset.len(); "test accuracy: {:.2}", metrics.accuracy);

    Ok(metrics.accuracy)
}

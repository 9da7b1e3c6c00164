use crate::{
    MlErr, Result,
    arch::{
        Model,
        loss::{CrossEntropy, LossFn},
        ops::argmax_rows,
    },
    dataset::Batch,
};

/// Accuracy and loss of a model over a sequence of batches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Percentage of examples whose arg-max prediction is their target, in `[0, 100]`.
    pub accuracy: f32,
    /// Mean of the per-batch cross-entropy losses. Batches weigh the same regardless of size.
    pub loss: f32,
}

/// Evaluates `model` in inference mode over every batch yielded by `batches`.
///
/// Goes through `Model::predict`, so the parameters are left untouched and evaluating the same
/// batches twice gives the same metrics.
///
/// # Errors
/// - `MlErr::InvalidInput` if `batches` yields nothing or a batch is empty.
/// - Whatever the model or the loss return.
pub fn evaluate<M, I>(model: &M, batches: I) -> Result<Metrics>
where
    M: Model + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    let loss_fn = CrossEntropy;

    let mut matches = 0;
    let mut examples = 0;
    let mut losses = Vec::new();

    for batch in batches {
        let scores = model.predict(batch.inputs())?;
        losses.push(loss_fn.loss(scores.view(), batch.targets())?);

        matches += argmax_rows(scores.view())
            .into_iter()
            .zip(batch.targets())
            .filter(|&(pred, &target)| pred == target)
            .count();
        examples += batch.len();
    }

    if losses.is_empty() {
        return Err(MlErr::invalid_input("cannot evaluate without any batch"));
    }

    Ok(Metrics {
        accuracy: matches as f32 / examples as f32 * 100.,
        loss: losses.iter().sum::<f32>() / losses.len() as f32,
    })
}

use ndarray::Array1;

use crate::{
    Result,
    arch::{
        Model,
        loss::check_targets,
        ops::{argmax_rows, softmax},
    },
    dataset::Batch,
};

/// One example together with how the model scored it.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedExample {
    pub input: Array1<f32>,
    /// Probability the model assigned to the true class.
    pub score: f32,
    pub target: usize,
    pub prediction: usize,
}

/// The examples of a dataset split by whether the model classified them correctly.
///
/// Both lists keep the order in which the examples were visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub good: Vec<RankedExample>,
    pub errors: Vec<RankedExample>,
}

impl Ranking {
    pub fn total(&self) -> usize {
        self.good.len() + self.errors.len()
    }

    /// The `k` misclassified examples the model gave the least probability to their true class,
    /// least confident first.
    pub fn least_confident_errors(&self, k: usize) -> Vec<&RankedExample> {
        let mut errors: Vec<&RankedExample> = self.errors.iter().collect();
        errors.sort_by(|a, b| a.score.total_cmp(&b.score));
        errors.truncate(k);
        errors
    }

    /// Mean true-class probability of `examples`, `None` if there are none.
    pub fn mean_score(examples: &[RankedExample]) -> Option<f32> {
        if examples.is_empty() {
            return None;
        }

        Some(examples.iter().map(|e| e.score).sum::<f32>() / examples.len() as f32)
    }
}

/// Scores every example yielded by `batches` in inference mode and sorts it into `good` or
/// `errors`.
///
/// # Errors
/// - `MlErr::InvalidInput` if a target is not one of the classes the model scores.
/// - Whatever the model returns.
pub fn rank<M, I>(model: &M, batches: I) -> Result<Ranking>
where
    M: Model + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    let mut ranking = Ranking::default();

    for batch in batches {
        let inputs = batch.inputs();
        let scores = model.predict(inputs)?;
        check_targets(batch.targets(), scores.ncols())?;

        let probs = softmax(scores.view());
        let predictions = argmax_rows(scores.view());

        let rows = inputs.rows().into_iter().zip(probs.rows());
        for ((input, probs), (&target, prediction)) in
            rows.zip(batch.targets().iter().zip(predictions))
        {
            let example = RankedExample {
                input: input.to_owned(),
                score: probs[target],
                target,
                prediction,
            };

            if prediction == target {
                ranking.good.push(example);
            } else {
                ranking.errors.push(example);
            }
        }
    }

    Ok(ranking)
}

use ndarray::{Array2, ArrayView2, Axis};

use super::LossFn;
use crate::{
    MlErr, Result,
    arch::ops::{log_sum_exp, softmax},
};

/// Softmax cross-entropy, averaged over the examples of the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn check(scores: ArrayView2<f32>, targets: &[usize]) -> Result<()> {
        if scores.nrows() == 0 {
            return Err(MlErr::invalid_input("cannot compute the loss of an empty batch"));
        }

        if targets.len() != scores.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "targets",
                got: targets.len(),
                expected: scores.nrows(),
            });
        }

        check_targets(targets, scores.ncols())
    }
}

/// Fails with `MlErr::InvalidInput` if a target is not one of `classes` score columns.
pub(crate) fn check_targets(targets: &[usize], classes: usize) -> Result<()> {
    if let Some(&t) = targets.iter().find(|&&t| t >= classes) {
        return Err(MlErr::invalid_input(format!(
            "target class {t} is out of range for {classes} classes"
        )));
    }

    Ok(())
}

impl LossFn for CrossEntropy {
    fn loss(&self, scores: ArrayView2<f32>, targets: &[usize]) -> Result<f32> {
        Self::check(scores, targets)?;

        let total: f32 = scores
            .axis_iter(Axis(0))
            .zip(targets)
            .map(|(row, &t)| log_sum_exp(row) - row[t])
            .sum();

        Ok(total / targets.len() as f32)
    }

    fn loss_prime(&self, scores: ArrayView2<f32>, targets: &[usize]) -> Result<Array2<f32>> {
        Self::check(scores, targets)?;

        let n = targets.len() as f32;
        let mut d = softmax(scores);
        for (mut row, &t) in d.axis_iter_mut(Axis(0)).zip(targets) {
            row[t] -= 1.0;
        }
        d.mapv_inplace(|g| g / n);

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn uniform_scores_give_log_of_classes() {
        let scores = Array2::<f32>::zeros((4, 10));
        let loss = CrossEntropy.loss(scores.view(), &[0, 3, 9, 5]).unwrap();
        assert!((loss - 10f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn confident_correct_scores_give_small_loss() {
        let scores = array![[20.0, 0.0], [0.0, 20.0]];
        let loss = CrossEntropy.loss(scores.view(), &[0, 1]).unwrap();
        assert!(loss >= 0.0 && loss < 1e-6);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let scores = array![[0.3, -1.2, 0.8], [1.5, 0.2, -0.4]];
        let targets = [2, 0];
        let d = CrossEntropy.loss_prime(scores.view(), &targets).unwrap();

        let eps = 1e-3;
        for ((i, j), &g) in d.indexed_iter() {
            let mut plus = scores.clone();
            plus[[i, j]] += eps;
            let mut minus = scores.clone();
            minus[[i, j]] -= eps;

            let numeric = (CrossEntropy.loss(plus.view(), &targets).unwrap()
                - CrossEntropy.loss(minus.view(), &targets).unwrap())
                / (2.0 * eps);
            assert!((numeric - g).abs() < 1e-3, "d[{i},{j}]: {numeric} vs {g}");
        }
    }

    #[test]
    fn rejects_bad_targets() {
        let scores = Array2::<f32>::zeros((2, 3));
        assert!(matches!(
            CrossEntropy.loss(scores.view(), &[0]),
            Err(MlErr::SizeMismatch { what: "targets", .. })
        ));
        assert!(matches!(
            CrossEntropy.loss(scores.view(), &[0, 3]),
            Err(MlErr::InvalidInput(_))
        ));
        assert!(CrossEntropy
            .loss(Array2::<f32>::zeros((0, 3)).view(), &[])
            .is_err());
    }
}

use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A loss between class scores and integer class targets.
pub trait LossFn {
    /// Returns the loss of the whole batch.
    fn loss(&self, scores: ArrayView2<f32>, targets: &[usize]) -> Result<f32>;

    /// Returns the derivative of `loss` with respect to each score.
    fn loss_prime(&self, scores: ArrayView2<f32>, targets: &[usize]) -> Result<Array2<f32>>;
}

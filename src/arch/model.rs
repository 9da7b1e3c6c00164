use ndarray::{Array2, ArrayView2};

use crate::{Result, optimization::Optimizer};

/// Whether a forward pass is part of training or of inference.
///
/// `Train` caches whatever the backward pass needs and enables training-only layers such as
/// dropout. `Eval` does neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// A classifier with its own flat parameter and gradient buffers.
///
/// Inputs are batches of flattened examples, one per row. Outputs are raw class scores, one row
/// per example and one column per class.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the current parameters.
    fn params(&self) -> &[f32];

    /// Returns the gradient accumulated since the last `zero_grad`.
    fn grad(&self) -> &[f32];

    /// Replaces the parameters, e.g. with the ones read from a checkpoint.
    ///
    /// # Errors
    /// `MlErr::SizeMismatch` if `params` doesn't have exactly `size()` elements.
    fn load_params(&mut self, params: Vec<f32>) -> Result<()>;

    /// Computes class scores in inference mode.
    ///
    /// Takes `&self`: nothing is cached and nothing can be mutated, so repeated calls on the
    /// same input give the same output.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Makes a forward pass in the given mode.
    ///
    /// Only a `Mode::Train` pass can be followed by `backward`.
    fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>>;

    /// Propagates the derivative of the loss with respect to the scores of the last training
    /// forward pass, accumulating the parameter gradient.
    fn backward(&mut self, d: Array2<f32>) -> Result<()>;

    /// Sets the accumulated gradient to zero.
    fn zero_grad(&mut self);

    /// Lets `optimizer` update the parameters with the accumulated gradient.
    fn optimize<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()>;
}

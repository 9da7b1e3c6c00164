use ndarray::{Array2, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};

use super::{Mode, Model, layers::Layer};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The parameters of all layers live in one flat buffer, each layer owning the contiguous slice
/// that follows the previous layer's one. The gradient buffer has the same layout.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
    rng: StdRng,
}

impl Sequential {
    /// Creates a new `Sequential` with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `seed` - Seed for parameter initialization and dropout masks.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if the layers are empty or don't chain.
    pub fn new<I>(layers: I, seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(MlErr::invalid_input("a model needs at least one layer"));
        }

        for pair in layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(MlErr::SizeMismatch {
                    what: "chained layer sizes",
                    got: pair[1].input_size(),
                    expected: pair[0].output_size(),
                });
            }
        }

        let size = layers.iter().map(Layer::size).sum();
        let mut params = vec![0.; size];
        let mut rng = StdRng::seed_from_u64(seed);

        let mut rest = params.as_mut_slice();
        for layer in &layers {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(layer.size());
            layer.init(head, &mut rng)?;
            rest = tail;
        }

        Ok(Self {
            layers,
            params,
            grad: vec![0.; size],
            rng,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The amount of features each input row must have.
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_size)
    }

    /// The amount of classes the model scores.
    pub fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, Layer::output_size)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn grad(&self) -> &[f32] {
        &self.grad
    }

    fn load_params(&mut self, params: Vec<f32>) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.params = params;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut rest = self.params.as_slice();
        let mut y = x.to_owned();

        for layer in &self.layers {
            let (params, tail) = rest.split_at(layer.size());
            y = layer.infer(params, y.view())?;
            rest = tail;
        }

        Ok(y)
    }

    fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        if mode == Mode::Eval {
            return self.predict(x);
        }

        let Self {
            layers,
            params,
            rng,
            ..
        } = self;

        let mut rest = params.as_slice();
        let mut y = x.to_owned();

        for layer in layers.iter_mut() {
            let (params, tail) = rest.split_at(layer.size());
            y = layer.forward(params, y.view(), rng)?;
            rest = tail;
        }

        Ok(y)
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<()> {
        let Self {
            layers,
            params,
            grad,
            ..
        } = self;

        let mut end = params.len();
        let mut d = d;

        for layer in layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    fn optimize<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&mut self.params, &self.grad)
    }
}

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Conv2d, Dense, Dropout, MaxPool2d, Relu};
use crate::{MlErr, Result};

#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Relu(Relu),
    Dropout(Dropout),
}

impl Layer {
    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    pub fn conv2d(
        input: (usize, usize, usize),
        out_channels: usize,
        kernel: usize,
        padding: usize,
    ) -> Result<Self> {
        Conv2d::new(input, out_channels, kernel, padding).map(Self::Conv2d)
    }

    pub fn max_pool2d(input: (usize, usize, usize), window: usize) -> Result<Self> {
        MaxPool2d::new(input, window).map(Self::MaxPool2d)
    }

    pub fn relu(dim: usize) -> Self {
        Self::Relu(Relu::new(dim))
    }

    pub fn dropout(dim: usize, p: f32) -> Result<Self> {
        Dropout::new(dim, p).map(Self::Dropout)
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size(),
            Layer::Conv2d(l) => l.size(),
            Layer::MaxPool2d(_) | Layer::Relu(_) | Layer::Dropout(_) => 0,
        }
    }

    pub fn input_size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.input_size(),
            Layer::Conv2d(l) => l.input_size(),
            Layer::MaxPool2d(l) => l.input_size(),
            Layer::Relu(l) => l.dim(),
            Layer::Dropout(l) => l.dim(),
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.output_size(),
            Layer::Conv2d(l) => l.output_size(),
            Layer::MaxPool2d(l) => l.output_size(),
            Layer::Relu(l) => l.dim(),
            Layer::Dropout(l) => l.dim(),
        }
    }

    /// Writes the initial values of this layer's parameters.
    pub fn init<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        match self {
            Layer::Dense(l) => l.init(params, rng),
            Layer::Conv2d(l) => l.init(params, rng),
            Layer::MaxPool2d(_) | Layer::Relu(_) | Layer::Dropout(_) => Ok(()),
        }
    }

    /// Inference forward pass, caches nothing.
    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(x)?;

        match self {
            Layer::Dense(l) => l.infer(params, x),
            Layer::Conv2d(l) => l.infer(params, x),
            Layer::MaxPool2d(l) => Ok(l.infer(x)),
            Layer::Relu(l) => Ok(l.infer(x)),
            Layer::Dropout(l) => Ok(l.infer(x)),
        }
    }

    /// Training forward pass, caches what `backward` needs.
    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        rng: &mut R,
    ) -> Result<Array2<f32>> {
        self.check_input(x)?;

        match self {
            Layer::Dense(l) => l.forward(params, x),
            Layer::Conv2d(l) => l.forward(params, x),
            Layer::MaxPool2d(l) => Ok(l.forward(x)),
            Layer::Relu(l) => Ok(l.forward(x)),
            Layer::Dropout(l) => Ok(l.forward(x, rng)),
        }
    }

    /// Accumulates this layer's gradient into `grad` and returns the deltas of its input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Layer::Dense(l) => l.backward(params, grad, d),
            Layer::Conv2d(l) => l.backward(params, grad, d),
            Layer::MaxPool2d(l) => l.backward(d),
            Layer::Relu(l) => l.backward(d),
            Layer::Dropout(l) => l.backward(d),
        }
    }

    fn check_input(&self, x: ArrayView2<f32>) -> Result<()> {
        let expected = self.input_size();
        if x.ncols() != expected {
            return Err(MlErr::SizeMismatch {
                what: "layer input",
                got: x.ncols(),
                expected,
            });
        }

        Ok(())
    }
}

use ndarray::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{MlErr, Result};

/// A fully connected layer, `y = x · W + b`.
///
/// Its parameter slice holds the `(input, output)` weight matrix in row-major order followed by
/// the `output` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
}

impl Dense {
    /// Creates a new `Dense` layer mapping `dim.0` inputs into `dim.1` outputs.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            x: None,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn input_size(&self) -> usize {
        self.dim.0
    }

    pub fn output_size(&self) -> usize {
        self.dim.1
    }

    /// He initialization for the weights, zeroed biases.
    pub fn init<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        let std = (2.0 / self.dim.0.max(1) as f32).sqrt();
        let normal = Normal::new(0.0, std).map_err(|e| MlErr::invalid_input(e.to_string()))?;

        let w_size = self.size - self.dim.1;
        let (w, b) = params.split_at_mut(w_size);
        w.iter_mut().for_each(|p| *p = normal.sample(rng));
        b.fill(0.0);

        Ok(())
    }

    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        Ok(x.dot(&w) + &b)
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let y = self.infer(params, x)?;
        self.x = Some(x.to_owned());
        Ok(y)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let x = self
            .x
            .take()
            .ok_or_else(|| MlErr::invalid_input("dense backward without a training forward"))?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw += &x.t().dot(&d);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let got = grad.len();
        let mismatch = |_| MlErr::SizeMismatch {
            what: "dense gradient",
            got,
            expected: self.size,
        };

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size.min(got));
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(mismatch)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(mismatch)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let got = params.len();
        let mismatch = |_| MlErr::SizeMismatch {
            what: "dense parameters",
            got,
            expected: self.size,
        };

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size.min(got));
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(mismatch)?;
        let biases = ArrayView1::from_shape(self.dim.1, b_raw).map_err(mismatch)?;
        Ok((weights, biases))
    }
}

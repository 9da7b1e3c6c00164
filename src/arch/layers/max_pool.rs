use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Non-overlapping max pooling over channel-first images, the window side is also the stride.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    input: (usize, usize, usize),
    window: usize,

    // Forward metadata, for each output the input position that won
    argmax: Option<Array2<usize>>,
}

impl MaxPool2d {
    pub fn new(input: (usize, usize, usize), window: usize) -> Result<Self> {
        let (_, h, w) = input;
        if window == 0 || window > h || window > w {
            return Err(MlErr::invalid_input(format!(
                "pooling window {window} doesn't fit a {h}x{w} image"
            )));
        }

        Ok(Self {
            input,
            window,
            argmax: None,
        })
    }

    pub fn input_size(&self) -> usize {
        let (c, h, w) = self.input;
        c * h * w
    }

    pub fn output_size(&self) -> usize {
        let (c, oh, ow) = self.output_shape();
        c * oh * ow
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        let (c, h, w) = self.input;
        (c, h / self.window, w / self.window)
    }

    pub fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        self.pool(x).0
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let (y, argmax) = self.pool(x);
        self.argmax = Some(argmax);
        y
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let argmax = self
            .argmax
            .take()
            .ok_or_else(|| MlErr::invalid_input("max pool backward without a training forward"))?;

        if argmax.dim() != d.dim() {
            return Err(MlErr::SizeMismatch {
                what: "max pool deltas",
                got: d.len(),
                expected: argmax.len(),
            });
        }

        let mut dx = Array2::zeros((d.nrows(), self.input_size()));
        for ((i, j), &src) in argmax.indexed_iter() {
            dx[[i, src]] += d[[i, j]];
        }

        Ok(dx)
    }

    fn pool(&self, x: ArrayView2<f32>) -> (Array2<f32>, Array2<usize>) {
        let (c, h, w) = self.input;
        let (_, oh, ow) = self.output_shape();
        let s = self.window;

        let mut y = Array2::zeros((x.nrows(), self.output_size()));
        let mut argmax = Array2::zeros(y.raw_dim());

        for (n, x_row) in x.rows().into_iter().enumerate() {
            for ci in 0..c {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut best = (ci * h + oy * s) * w + ox * s;
                        for dy in 0..s {
                            for dx in 0..s {
                                let idx = (ci * h + oy * s + dy) * w + ox * s + dx;
                                if x_row[idx] > x_row[best] {
                                    best = idx;
                                }
                            }
                        }

                        let out = (ci * oh + oy) * ow + ox;
                        y[[n, out]] = x_row[best];
                        argmax[[n, out]] = best;
                    }
                }
            }
        }

        (y, argmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn pools_each_window() {
        let pool = MaxPool2d::new((1, 4, 4), 2).unwrap();
        let x = array![[
            1., 2., 5., 0., //
            3., 4., 1., 1., //
            0., 0., 9., 8., //
            7., 0., 6., 5.,
        ]];

        assert_eq!(pool.output_shape(), (1, 2, 2));
        assert_eq!(pool.infer(x.view()), array![[4., 5., 7., 9.]]);
    }

    #[test]
    fn odd_sizes_drop_the_remainder() {
        let pool = MaxPool2d::new((2, 5, 5), 2).unwrap();
        assert_eq!(pool.output_shape(), (2, 2, 2));
        assert!(MaxPool2d::new((1, 1, 1), 2).is_err());
    }

    #[test]
    fn backward_routes_deltas_to_the_winners() {
        let mut pool = MaxPool2d::new((1, 2, 2), 2).unwrap();
        pool.forward(array![[0.5, 2., -1., 1.]].view());

        let dx = pool.backward(array![[3.]]).unwrap();
        assert_eq!(dx, array![[0., 3., 0., 0.]]);
    }
}

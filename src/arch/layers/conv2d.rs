use ndarray::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{MlErr, Result};

/// A 2D convolution with stride 1 and zero padding over channel-first images.
///
/// Every input row is one image flattened as `(channels, height, width)`, every output row one
/// feature map flattened as `(out_channels, out_height, out_width)`.
///
/// The parameter slice holds the `(out_channels, channels, kernel, kernel)` filters followed by
/// the `out_channels` biases. Convolutions are computed as a matrix product over the `im2col`
/// expansion of each image.
#[derive(Debug, Clone)]
pub struct Conv2d {
    input: (usize, usize, usize),
    out_channels: usize,
    kernel: usize,
    padding: usize,
    output_hw: (usize, usize),

    // Forward metadata, one column matrix per image
    cols: Option<Vec<Array2<f32>>>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `input` - The `(channels, height, width)` shape of the incoming images.
    /// * `out_channels` - The amount of filters.
    /// * `kernel` - The side of the square filters.
    /// * `padding` - The amount of zeros added on every border.
    ///
    /// # Returns
    /// A new `Conv2d` or an error if the kernel doesn't fit in the padded image.
    pub fn new(
        input: (usize, usize, usize),
        out_channels: usize,
        kernel: usize,
        padding: usize,
    ) -> Result<Self> {
        let (c, h, w) = input;
        if c == 0 || out_channels == 0 || kernel == 0 {
            return Err(MlErr::invalid_input(
                "conv2d needs at least one channel, one filter and a non-empty kernel",
            ));
        }

        if kernel > h + 2 * padding || kernel > w + 2 * padding {
            return Err(MlErr::invalid_input(format!(
                "conv2d kernel {kernel} doesn't fit a {h}x{w} image padded by {padding}"
            )));
        }

        Ok(Self {
            input,
            out_channels,
            kernel,
            padding,
            output_hw: (h + 2 * padding - kernel + 1, w + 2 * padding - kernel + 1),
            cols: None,
        })
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.out_channels * (self.patch_len() + 1)
    }

    pub fn input_size(&self) -> usize {
        let (c, h, w) = self.input;
        c * h * w
    }

    pub fn output_size(&self) -> usize {
        self.out_channels * self.output_hw.0 * self.output_hw.1
    }

    /// The `(channels, height, width)` shape of each output row.
    pub fn output_shape(&self) -> (usize, usize, usize) {
        (self.out_channels, self.output_hw.0, self.output_hw.1)
    }

    fn patch_len(&self) -> usize {
        self.input.0 * self.kernel * self.kernel
    }

    /// He initialization over the fan-in of a filter, zeroed biases.
    pub fn init<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        let std = (2.0 / self.patch_len() as f32).sqrt();
        let normal = Normal::new(0.0, std).map_err(|e| MlErr::invalid_input(e.to_string()))?;

        let w_size = self.out_channels * self.patch_len();
        let (w, b) = params.split_at_mut(w_size);
        w.iter_mut().for_each(|p| *p = normal.sample(rng));
        b.fill(0.0);

        Ok(())
    }

    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.convolve(params, x, None)
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut cols = Vec::with_capacity(x.nrows());
        let y = self.convolve(params, x, Some(&mut cols))?;
        self.cols = Some(cols);
        Ok(y)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let cols = self
            .cols
            .take()
            .ok_or_else(|| MlErr::invalid_input("conv2d backward without a training forward"))?;

        if cols.len() != d.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "conv2d deltas",
                got: d.nrows(),
                expected: cols.len(),
            });
        }

        let (w, _) = self.view_params(params)?;
        let (mut dw, mut db) = self.view_grad(grad)?;
        let map_len = self.output_hw.0 * self.output_hw.1;
        let mut dx = Array2::zeros((d.nrows(), self.input_size()));

        for ((d_row, cols), dx_row) in d.rows().into_iter().zip(&cols).zip(dx.rows_mut()) {
            let d_map = Array2::from_shape_vec((self.out_channels, map_len), d_row.to_vec())
                .map_err(|_| MlErr::SizeMismatch {
                    what: "conv2d deltas",
                    got: d_row.len(),
                    expected: self.output_size(),
                })?;

            dw += &d_map.dot(&cols.t());
            db += &d_map.sum_axis(Axis(1));

            let d_cols = w.t().dot(&d_map);
            self.col2im(d_cols.view(), dx_row);
        }

        Ok(dx)
    }

    fn convolve(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        mut cache: Option<&mut Vec<Array2<f32>>>,
    ) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        let b = b.insert_axis(Axis(1));
        let mut y = Array2::zeros((x.nrows(), self.output_size()));

        for (x_row, mut y_row) in x.rows().into_iter().zip(y.rows_mut()) {
            let cols = self.im2col(x_row);
            let maps = w.dot(&cols) + &b;
            y_row
                .iter_mut()
                .zip(maps.iter())
                .for_each(|(y, &m)| *y = m);

            if let Some(cache) = cache.as_deref_mut() {
                cache.push(cols);
            }
        }

        Ok(y)
    }

    /// Expands an image into a `(channels * kernel * kernel, out_height * out_width)` matrix
    /// where each column is the patch under one output position.
    fn im2col(&self, x: ArrayView1<f32>) -> Array2<f32> {
        let (c, h, w) = self.input;
        let (oh, ow) = self.output_hw;
        let (k, p) = (self.kernel, self.padding);
        let mut cols = Array2::zeros((self.patch_len(), oh * ow));

        for ci in 0..c {
            for ky in 0..k {
                for kx in 0..k {
                    let row = (ci * k + ky) * k + kx;
                    for oy in 0..oh {
                        let Some(iy) = (oy + ky).checked_sub(p).filter(|&iy| iy < h) else {
                            continue;
                        };

                        for ox in 0..ow {
                            let Some(ix) = (ox + kx).checked_sub(p).filter(|&ix| ix < w) else {
                                continue;
                            };

                            cols[[row, oy * ow + ox]] = x[(ci * h + iy) * w + ix];
                        }
                    }
                }
            }
        }

        cols
    }

    /// Inverse scatter of `im2col`: adds every column entry back into the pixel it came from.
    fn col2im(&self, cols: ArrayView2<f32>, mut dx: ArrayViewMut1<f32>) {
        let (c, h, w) = self.input;
        let (oh, ow) = self.output_hw;
        let (k, p) = (self.kernel, self.padding);

        for ci in 0..c {
            for ky in 0..k {
                for kx in 0..k {
                    let row = (ci * k + ky) * k + kx;
                    for oy in 0..oh {
                        let Some(iy) = (oy + ky).checked_sub(p).filter(|&iy| iy < h) else {
                            continue;
                        };

                        for ox in 0..ow {
                            let Some(ix) = (ox + kx).checked_sub(p).filter(|&ix| ix < w) else {
                                continue;
                            };

                            dx[(ci * h + iy) * w + ix] += cols[[row, oy * ow + ox]];
                        }
                    }
                }
            }
        }
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let got = params.len();
        let mismatch = |_| MlErr::SizeMismatch {
            what: "conv2d parameters",
            got,
            expected: self.size(),
        };

        let w_size = self.out_channels * self.patch_len();
        let (w_raw, b_raw) = params.split_at(w_size.min(got));
        let weights =
            ArrayView2::from_shape((self.out_channels, self.patch_len()), w_raw).map_err(mismatch)?;
        let biases = ArrayView1::from_shape(self.out_channels, b_raw).map_err(mismatch)?;
        Ok((weights, biases))
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let got = grad.len();
        let mismatch = |_| MlErr::SizeMismatch {
            what: "conv2d gradient",
            got,
            expected: self.size(),
        };

        let w_size = self.out_channels * self.patch_len();
        let (dw_raw, db_raw) = grad.split_at_mut(w_size.min(got));
        let dw = ArrayViewMut2::from_shape((self.out_channels, self.patch_len()), dw_raw)
            .map_err(mismatch)?;
        let db = ArrayViewMut1::from_shape(self.out_channels, db_raw).map_err(mismatch)?;
        Ok((dw, db))
    }
}

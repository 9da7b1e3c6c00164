use ndarray::prelude::*;

use crate::{MlErr, Result};

#[derive(Debug, Clone)]
pub struct Relu {
    dim: usize,
    z: Option<Array2<f32>>,
}

impl Relu {
    pub fn new(dim: usize) -> Self {
        Self { dim, z: None }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn infer(&self, z: ArrayView2<f32>) -> Array2<f32> {
        z.mapv(|z| z.max(0.))
    }

    pub fn forward(&mut self, z: ArrayView2<f32>) -> Array2<f32> {
        self.z = Some(z.to_owned());
        self.infer(z)
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        let z = self
            .z
            .take()
            .ok_or_else(|| MlErr::invalid_input("relu backward without a training forward"))?;

        if z.dim() != d.dim() {
            return Err(MlErr::SizeMismatch {
                what: "relu deltas",
                got: d.len(),
                expected: z.len(),
            });
        }

        d.zip_mut_with(&z, |d, &z| {
            if z <= 0. {
                *d = 0.;
            }
        });

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn clamps_negatives_and_masks_their_deltas() {
        let mut relu = Relu::new(3);
        let y = relu.forward(array![[-1., 0., 2.]].view());
        assert_eq!(y, array![[0., 0., 2.]]);

        let d = relu.backward(array![[5., 5., 5.]]).unwrap();
        assert_eq!(d, array![[0., 0., 5.]]);
    }
}

use ndarray::prelude::*;
use rand::Rng;

use crate::{MlErr, Result};

/// Inverted dropout: during training each activation is zeroed with probability `p` and the
/// survivors are scaled by `1 / (1 - p)`. Inference is the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    dim: usize,
    p: f32,
    mask: Option<Array2<f32>>,
}

impl Dropout {
    pub fn new(dim: usize, p: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(MlErr::invalid_input(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }

        Ok(Self { dim, p, mask: None })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.to_owned()
    }

    pub fn forward<R: Rng + ?Sized>(&mut self, x: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        let keep = 1. / (1. - self.p);
        let mask = Array2::from_shape_simple_fn(x.raw_dim(), || {
            if rng.random::<f32>() < self.p { 0. } else { keep }
        });

        let y = &x * &mask;
        self.mask = Some(mask);
        y
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let mask = self
            .mask
            .take()
            .ok_or_else(|| MlErr::invalid_input("dropout backward without a training forward"))?;

        if mask.dim() != d.dim() {
            return Err(MlErr::SizeMismatch {
                what: "dropout deltas",
                got: d.len(),
                expected: mask.len(),
            });
        }

        Ok(d * mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn inference_is_identity() {
        let dropout = Dropout::new(4, 0.5).unwrap();
        let x = Array2::from_elem((2, 4), 3.);
        assert_eq!(dropout.infer(x.view()), x);
    }

    #[test]
    fn training_zeroes_or_scales() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut dropout = Dropout::new(100, 0.5).unwrap();
        let y = dropout.forward(Array2::ones((4, 100)).view(), &mut rng);

        assert!(y.iter().all(|&v| v == 0. || v == 2.));
        assert!(y.iter().any(|&v| v == 0.));
        assert!(y.iter().any(|&v| v == 2.));

        let d = dropout.backward(Array2::ones((4, 100))).unwrap();
        assert_eq!(d, y);
    }

    #[test]
    fn rejects_bad_probabilities() {
        assert!(Dropout::new(1, 1.).is_err());
        assert!(Dropout::new(1, -0.1).is_err());
        assert!(Dropout::new(1, f32::NAN).is_err());
    }
}

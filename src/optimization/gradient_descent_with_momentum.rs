use super::{Optimizer, check_sizes};
use crate::Result;

#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Vec<f32>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` for `len` parameters.
    ///
    /// Each step moves along a velocity that keeps `momentum` of the previous one and adds the
    /// current gradient.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len],
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_sizes(params, grad)?;
        check_sizes(&self.velocity, grad)?;

        for ((p, &g), v) in params.iter_mut().zip(grad).zip(self.velocity.iter_mut()) {
            *v = self.momentum * *v + g;
            *p -= self.learning_rate * *v;
        }

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

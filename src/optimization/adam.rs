use super::{Optimizer, check_sizes};
use crate::Result;

/// Adam: per-parameter step sizes from bias-corrected running moments of the gradient.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: i32,
    first_moment: Vec<f32>,
    second_moment: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer for `len` parameters.
    ///
    /// # Arguments
    /// * `beta1`, `beta2` - Decay rates of the first and second moment estimates.
    /// * `epsilon` - Added to the denominator to keep steps finite.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: 0,
            first_moment: vec![0.; len],
            second_moment: vec![0.; len],
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_sizes(params, grad)?;
        check_sizes(&self.first_moment, grad)?;

        self.steps = self.steps.saturating_add(1);
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let m_correction = 1. - b1.powi(self.steps);
        let v_correction = 1. - b2.powi(self.steps);

        let moments = self.first_moment.iter_mut().zip(self.second_moment.iter_mut());
        for ((p, &g), (m, v)) in params.iter_mut().zip(grad).zip(moments) {
            *m = b1 * *m + (1. - b1) * g;
            *v = b2 * *v + (1. - b2) * g * g;

            let m_hat = *m / m_correction;
            let v_hat = *v / v_correction;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + eps);
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

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::Optimizer;

/// How the learning rate evolves with the amount of scheduler steps taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Keep the base learning rate.
    #[default]
    Constant,
    /// Multiply by `gamma` every `step_size` steps.
    Step { step_size: usize, gamma: f32 },
    /// Multiply by `gamma` every step.
    Exponential { gamma: f32 },
    /// Cosine decay from the base learning rate down to `eta_min` over `t_max` steps.
    Cosine { t_max: usize, eta_min: f32 },
}

impl SchedulePolicy {
    /// The learning rate after `step` scheduler steps, starting from `base`.
    pub fn learning_rate(&self, base: f32, step: usize) -> f32 {
        match *self {
            SchedulePolicy::Constant => base,
            SchedulePolicy::Step { step_size, gamma } => {
                base * gamma.powi((step / step_size.max(1)) as i32)
            }
            SchedulePolicy::Exponential { gamma } => base * gamma.powi(step as i32),
            SchedulePolicy::Cosine { t_max, eta_min } => {
                if t_max == 0 {
                    return eta_min;
                }

                let progress = step.min(t_max) as f32 / t_max as f32;
                eta_min + (base - eta_min) * (1. + (PI * progress).cos()) / 2.
            }
        }
    }
}

/// Drives an optimizer's learning rate, advanced once per epoch.
///
/// The rate used during epoch `i` is the policy evaluated at step `i + 1`, since the training
/// loop advances the scheduler before the epoch's first batch.
#[derive(Debug, Clone)]
pub struct LrScheduler {
    policy: SchedulePolicy,
    base_lr: f32,
    step: usize,
}

impl LrScheduler {
    pub fn new(policy: SchedulePolicy, base_lr: f32) -> Self {
        Self {
            policy,
            base_lr,
            step: 0,
        }
    }

    /// Creates a scheduler whose base is the optimizer's current learning rate.
    pub fn for_optimizer<O: Optimizer + ?Sized>(policy: SchedulePolicy, optimizer: &O) -> Self {
        Self::new(policy, optimizer.learning_rate())
    }

    /// Takes one step and writes the new learning rate into `optimizer`.
    ///
    /// # Returns
    /// The learning rate now in use.
    pub fn advance<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> f32 {
        self.step += 1;
        let lr = self.policy.learning_rate(self.base_lr, self.step);
        optimizer.set_learning_rate(lr);
        lr
    }

    /// The amount of times `advance` was called.
    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }
}

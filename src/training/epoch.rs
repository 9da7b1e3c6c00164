use log::debug;

use super::StepStats;
use crate::{
    MlErr, Result,
    arch::{Mode, Model, loss::LossFn},
    dataset::Batch,
    optimization::{LrScheduler, Optimizer},
};

/// Makes one training pass over `batches`, taking one optimizer step per batch.
///
/// If a scheduler is given it is advanced once, before the first batch.
///
/// # Errors
/// - `MlErr::NonFiniteLoss` or `MlErr::NonFiniteGradient` as soon as a batch produces one. The
///   offending batch never reaches the optimizer.
/// - Whatever the model, the loss or the optimizer return.
pub fn run_epoch<L, M, O, I>(
    loss_fn: &L,
    model: &mut M,
    optimizer: &mut O,
    scheduler: Option<&mut LrScheduler>,
    batches: I,
) -> Result<StepStats>
where
    L: LossFn + ?Sized,
    M: Model + ?Sized,
    O: Optimizer + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    if let Some(scheduler) = scheduler {
        let lr = scheduler.advance(optimizer);
        debug!(step = scheduler.steps(), lr = lr; "scheduler advanced");
    }

    let mut stats = StepStats::default();

    for (i, batch) in batches.into_iter().enumerate() {
        model.zero_grad();

        let scores = model.forward(batch.inputs(), Mode::Train)?;
        let loss = loss_fn.loss(scores.view(), batch.targets())?;
        if !loss.is_finite() {
            return Err(MlErr::NonFiniteLoss { batch: i, loss });
        }

        let d = loss_fn.loss_prime(scores.view(), batch.targets())?;
        model.backward(d)?;
        if model.grad().iter().any(|g| !g.is_finite()) {
            return Err(MlErr::NonFiniteGradient { batch: i });
        }

        model.optimize(optimizer)?;
        stats.record_batch(batch.len());
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer, loss::CrossEntropy},
        optimization::{GradientDescent, SchedulePolicy},
    };
    use ndarray::array;

    fn batches() -> Vec<Batch> {
        vec![
            Batch::new(array![[1., 0.], [0., 1.]], vec![0, 1]).unwrap(),
            Batch::new(array![[0.5, 0.5]], vec![1]).unwrap(),
        ]
    }

    #[test]
    fn one_step_per_batch() {
        let mut net = Sequential::new([Layer::dense((2, 2))], 3).unwrap();
        let before = net.params().to_vec();
        let mut sgd = GradientDescent::new(0.1);

        let stats = run_epoch(&CrossEntropy, &mut net, &mut sgd, None, batches()).unwrap();
        assert_eq!(stats, StepStats::new(2, 3));
        assert_ne!(net.params(), before.as_slice());
    }

    #[test]
    fn scheduler_advances_once_before_the_batches() {
        let mut net = Sequential::new([Layer::dense((2, 2))], 3).unwrap();
        let mut sgd = GradientDescent::new(1.0);
        let policy = SchedulePolicy::Exponential { gamma: 0.5 };
        let mut scheduler = LrScheduler::for_optimizer(policy, &sgd);

        let scheduler_ref = Some(&mut scheduler);
        run_epoch(&CrossEntropy, &mut net, &mut sgd, scheduler_ref, batches()).unwrap();
        assert_eq!(scheduler.steps(), 1);
        assert_eq!(sgd.learning_rate(), 0.5);
    }

    #[test]
    fn non_finite_loss_stops_before_the_update() {
        let mut net = Sequential::new([Layer::dense((2, 2))], 3).unwrap();
        let before = net.params().to_vec();
        let mut sgd = GradientDescent::new(0.1);
        let bad = vec![Batch::new(array![[f32::NAN, 0.]], vec![0]).unwrap()];

        let err = run_epoch(&CrossEntropy, &mut net, &mut sgd, None, bad).unwrap_err();
        assert!(matches!(err, MlErr::NonFiniteLoss { batch: 0, .. }));
        assert_eq!(net.params(), before.as_slice());
    }
}

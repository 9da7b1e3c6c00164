mod adam;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod optimizer;
mod scheduler;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use optimizer::Optimizer;
pub use scheduler::{LrScheduler, SchedulePolicy};

use crate::{MlErr, Result};

fn check_sizes(params: &[f32], grad: &[f32]) -> Result<()> {
    if params.len() != grad.len() {
        return Err(MlErr::SizeMismatch {
            what: "gradient",
            got: grad.len(),
            expected: params.len(),
        });
    }

    Ok(())
}

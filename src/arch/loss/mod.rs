mod cross_entropy;
mod loss_fn;

pub(crate) use cross_entropy::check_targets;
pub use cross_entropy::CrossEntropy;
pub use loss_fn::LossFn;

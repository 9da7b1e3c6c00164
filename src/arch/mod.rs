pub mod layers;
pub mod loss;
mod model;
pub mod ops;
mod sequential;

pub use model::{Mode, Model};
pub use sequential::Sequential;

mod conv2d;
mod dense;
mod dropout;
mod layer;
mod max_pool;
mod relu;

pub use conv2d::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use layer::Layer;
pub use max_pool::MaxPool2d;
pub use relu::Relu;

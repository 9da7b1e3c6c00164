pub mod cifar;
mod dataloader;
mod dataset;

pub use dataloader::{Batches, DataLoader, Sampler};
pub use dataset::{Batch, InMemoryDataset};

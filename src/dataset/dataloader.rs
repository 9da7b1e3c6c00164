use std::num::NonZeroUsize;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::dataset::{Batch, InMemoryDataset};

/// The order in which a `DataLoader` visits the examples.
#[derive(Debug, Clone)]
pub enum Sampler {
    /// Dataset order, every pass.
    Sequential,
    /// A fresh permutation on every pass, drawn from the owned generator.
    Shuffled(StdRng),
}

/// Batches a borrowed dataset.
///
/// Every call to `iter` is one pass over the whole dataset; only the last batch may be smaller
/// than `batch_size`.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a InMemoryDataset,
    batch_size: NonZeroUsize,
    sampler: Sampler,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a InMemoryDataset, batch_size: NonZeroUsize, sampler: Sampler) -> Self {
        Self {
            dataset,
            batch_size,
            sampler,
        }
    }

    /// A loader that always yields the examples in dataset order.
    pub fn sequential(dataset: &'a InMemoryDataset, batch_size: NonZeroUsize) -> Self {
        Self::new(dataset, batch_size, Sampler::Sequential)
    }

    /// A loader that reshuffles the examples on every pass, reproducibly for a given `seed`.
    pub fn shuffled(dataset: &'a InMemoryDataset, batch_size: NonZeroUsize, seed: u64) -> Self {
        Self::new(
            dataset,
            batch_size,
            Sampler::Shuffled(StdRng::seed_from_u64(seed)),
        )
    }

    #[inline]
    pub fn dataset(&self) -> &'a InMemoryDataset {
        self.dataset
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// The amount of batches a pass yields.
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size.get())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Starts a new pass over the dataset.
    pub fn iter(&mut self) -> Batches<'a> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if let Sampler::Shuffled(rng) = &mut self.sampler {
            order.shuffle(rng);
        }

        Batches {
            dataset: self.dataset,
            order,
            batch_size: self.batch_size.get(),
            cursor: 0,
        }
    }
}

/// One pass of a `DataLoader`.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    dataset: &'a InMemoryDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.batch(&self.order[self.cursor..end]);
        self.cursor = end;

        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches<'_> {}

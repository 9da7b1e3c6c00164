/// Counters produced by a single pass of the epoch runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    batches: usize,
    samples: usize,
}

impl StepStats {
    /// Creates a new `StepStats`.
    ///
    /// # Arguments
    /// * `batches` - Number of batches processed, which is also the number of optimizer steps.
    /// * `samples` - Total number of examples in those batches.
    pub fn new(batches: usize, samples: usize) -> Self {
        Self { batches, samples }
    }

    /// Returns the number of batches processed.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Returns the number of examples processed.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub(crate) fn record_batch(&mut self, samples: usize) {
        self.batches += 1;
        self.samples += samples;
    }
}

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A labeled in-memory dataset.
///
/// Every example is one row of `inputs` (an image flattened channel-first) and has an integer
/// class label in `0..num_classes`.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    inputs: Array2<f32>,
    labels: Vec<usize>,
    num_classes: usize,
}

impl InMemoryDataset {
    /// Creates a new dataset.
    ///
    /// # Errors
    /// - `MlErr::SizeMismatch` if there isn't exactly one label per row.
    /// - `MlErr::InvalidInput` if a label is not below `num_classes`.
    pub fn new(inputs: Array2<f32>, labels: Vec<usize>, num_classes: usize) -> Result<Self> {
        if inputs.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: inputs.nrows(),
            });
        }

        if let Some(&label) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(MlErr::invalid_input(format!(
                "label {label} is out of range for {num_classes} classes"
            )));
        }

        Ok(Self {
            inputs,
            labels,
            num_classes,
        })
    }

    /// Creates a dataset from a flat buffer holding `features` values per example.
    pub fn from_flat(
        data: Vec<f32>,
        features: usize,
        labels: Vec<usize>,
        num_classes: usize,
    ) -> Result<Self> {
        let got = data.len();
        let inputs = Array2::from_shape_vec((labels.len(), features), data).map_err(|_| {
            MlErr::SizeMismatch {
                what: "flat inputs",
                got,
                expected: labels.len() * features,
            }
        })?;

        Self::new(inputs, labels, num_classes)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The amount of values each example has.
    #[inline]
    pub fn features(&self) -> usize {
        self.inputs.ncols()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.inputs.view()
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Returns the example at `idx`, if any.
    pub fn sample(&self, idx: usize) -> Option<(ArrayView1<'_, f32>, usize)> {
        let label = *self.labels.get(idx)?;
        Some((self.inputs.row(idx), label))
    }

    /// Copies the given examples, in the given order, into a new dataset.
    ///
    /// # Panics
    /// If an index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            inputs: gather_rows(self.inputs.view(), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            num_classes: self.num_classes,
        }
    }

    /// Splits the dataset into a training and a validation subset.
    ///
    /// Example indices are shuffled with `seed` and the first `floor(train_split * len)` go to
    /// training, the rest to validation. A `train_split` of 1 leaves validation empty.
    ///
    /// # Errors
    /// `MlErr::InvalidInput` if `train_split` is not in `[0, 1]`.
    pub fn split(&self, train_split: f32, seed: u64) -> Result<(Self, Self)> {
        if !(0.0..=1.0).contains(&train_split) {
            return Err(MlErr::invalid_input(format!(
                "train split must be in [0, 1], got {train_split}"
            )));
        }

        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_train = (train_split as f64 * self.len() as f64).floor() as usize;
        let (train, valid) = indices.split_at(n_train.min(self.len()));

        Ok((self.select(train), self.select(valid)))
    }

    /// Gathers the given examples into a batch.
    pub(crate) fn batch(&self, indices: &[usize]) -> Batch {
        Batch {
            inputs: gather_rows(self.inputs.view(), indices),
            targets: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

fn gather_rows(inputs: ArrayView2<f32>, indices: &[usize]) -> Array2<f32> {
    if indices.is_empty() {
        return Array2::zeros((0, inputs.ncols()));
    }

    inputs.select(Axis(0), indices)
}

/// A group of examples processed together: one input row and one class target per example.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    inputs: Array2<f32>,
    targets: Vec<usize>,
}

impl Batch {
    /// # Errors
    /// `MlErr::SizeMismatch` if there isn't exactly one target per input row.
    pub fn new(inputs: Array2<f32>, targets: Vec<usize>) -> Result<Self> {
        if inputs.nrows() != targets.len() {
            return Err(MlErr::SizeMismatch {
                what: "batch targets",
                got: targets.len(),
                expected: inputs.nrows(),
            });
        }

        Ok(Self { inputs, targets })
    }

    #[inline]
    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.inputs.view()
    }

    #[inline]
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ten_examples() -> InMemoryDataset {
        let inputs = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f32);
        InMemoryDataset::new(inputs, (0..10).map(|i| i % 3).collect(), 3).unwrap()
    }

    #[test]
    fn dataset_basic() {
        let ds = ten_examples();
        assert_eq!(ds.len(), 10);
        assert_eq!(ds.features(), 2);

        let (x, y) = ds.sample(4).unwrap();
        assert_eq!(x, array![8., 9.]);
        assert_eq!(y, 1);
        assert!(ds.sample(10).is_none());
    }

    #[test]
    fn rejects_bad_labels() {
        let inputs = Array2::zeros((2, 1));
        assert!(matches!(
            InMemoryDataset::new(inputs.clone(), vec![0], 2),
            Err(MlErr::SizeMismatch { .. })
        ));
        assert!(matches!(
            InMemoryDataset::new(inputs, vec![0, 2], 2),
            Err(MlErr::InvalidInput(_))
        ));
        assert!(InMemoryDataset::from_flat(vec![0.; 5], 2, vec![0, 1], 2).is_err());
    }

    #[test]
    fn split_partitions_the_examples() {
        let ds = ten_examples();
        let (train, valid) = ds.split(0.8, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(valid.len(), 2);

        // every first feature is unique, so they identify the examples
        let mut seen: Vec<f32> = train
            .inputs()
            .column(0)
            .iter()
            .chain(valid.inputs().column(0).iter())
            .copied()
            .collect();
        seen.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..10).map(|i| (i * 2) as f32).collect();
        assert_eq!(seen, expected);

        let (again, _) = ds.split(0.8, 42).unwrap();
        assert_eq!(again.inputs(), train.inputs());
    }

    #[test]
    fn full_split_leaves_validation_empty() {
        let (train, valid) = ten_examples().split(1.0, 0).unwrap();
        assert_eq!(train.len(), 10);
        assert!(valid.is_empty());
        assert!(ten_examples().split(1.5, 0).is_err());
    }

    #[test]
    fn batch_basic() {
        let b = Batch::new(array![[1.0, 2.0], [3.0, 5.0]], vec![0, 1]).unwrap();
        assert_eq!(b.len(), 2);
        assert!(Batch::new(array![[1.0]], vec![0, 1]).is_err());
    }
}

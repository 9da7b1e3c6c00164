#![allow(dead_code)]

use std::cell::RefCell;

use ndarray::{Array2, ArrayView2};

use convtrain::{
    MlErr, Result,
    arch::{Mode, Model},
    dataset::InMemoryDataset,
    optimization::Optimizer,
};

/// Scores class 0 above every other class, whatever the input.
///
/// Records the first feature of every row it scores, one list per batch. If `poison_at` is set it
/// starts returning NaN scores from that training forward pass on, and `backward` fills the
/// gradient with `gradient`.
pub struct ConstantScorer {
    classes: usize,
    features: usize,
    params: Vec<f32>,
    grad: Vec<f32>,
    train_forwards: usize,
    poison_at: Option<usize>,
    gradient: f32,
    pub seen: RefCell<Vec<Vec<f32>>>,
}

impl ConstantScorer {
    pub fn new(features: usize, classes: usize) -> Self {
        Self {
            classes,
            features,
            params: vec![0.; 2],
            grad: vec![0.; 2],
            train_forwards: 0,
            poison_at: None,
            gradient: 0.1,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn poisoned_at(mut self, forward: usize) -> Self {
        self.poison_at = Some(forward);
        self
    }

    /// Makes every `backward` write `gradient`, while the scores stay finite.
    pub fn with_gradient(mut self, gradient: f32) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn train_forwards(&self) -> usize {
        self.train_forwards
    }

    fn scores(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.features {
            return Err(MlErr::SizeMismatch {
                what: "input",
                got: x.ncols(),
                expected: self.features,
            });
        }

        self.seen.borrow_mut().push(x.column(0).to_vec());
        let mut scores = Array2::zeros((x.nrows(), self.classes));
        scores.column_mut(0).fill(1.);
        Ok(scores)
    }
}

impl Model for ConstantScorer {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn grad(&self) -> &[f32] {
        &self.grad
    }

    fn load_params(&mut self, params: Vec<f32>) -> Result<()> {
        self.params = params;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.scores(x)
    }

    fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        if mode == Mode::Eval {
            return self.predict(x);
        }

        let scores = self.scores(x)?;
        let poisoned = self.poison_at.is_some_and(|at| self.train_forwards >= at);
        self.train_forwards += 1;

        if poisoned {
            return Ok(scores.mapv(|_| f32::NAN));
        }
        Ok(scores)
    }

    fn backward(&mut self, _d: Array2<f32>) -> Result<()> {
        self.grad.fill(self.gradient);
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    fn optimize<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&mut self.params, &self.grad)
    }
}

/// Counts the updates it's asked to make, and makes none.
#[derive(Debug, Default)]
pub struct CountingOptimizer {
    pub steps: usize,
    learning_rate: f32,
}

impl Optimizer for CountingOptimizer {
    fn update_params(&mut self, _params: &mut [f32], _grad: &[f32]) -> Result<()> {
        self.steps += 1;
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

/// One example per label with `features` values each, the first feature being the example's index.
pub fn indexed_dataset(features: usize, labels: Vec<usize>, classes: usize) -> InMemoryDataset {
    let inputs = Array2::from_shape_fn((labels.len(), features), |(i, j)| match j {
        0 => i as f32,
        _ => 0.5,
    });
    InMemoryDataset::new(inputs, labels, classes).unwrap()
}

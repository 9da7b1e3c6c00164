mod common;

use std::num::NonZeroUsize;

use convtrain::{
    MlErr,
    arch::{Model, Sequential, layers::Layer},
    dataset::{Batch, DataLoader, InMemoryDataset},
    training::{evaluate, rank, test},
};
use ndarray::Array2;

use common::{ConstantScorer, indexed_dataset};

fn batch_size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn noisy_dataset(n: usize, features: usize, classes: usize) -> InMemoryDataset {
    let inputs = Array2::from_shape_fn((n, features), |(i, j)| ((i * 7 + j * 3) as f32).sin());
    InMemoryDataset::new(inputs, (0..n).map(|i| i % classes).collect(), classes).unwrap()
}

fn small_net(features: usize, classes: usize) -> Sequential {
    Sequential::new(
        [
            Layer::dense((features, 6)),
            Layer::relu(6),
            Layer::dropout(6, 0.5).unwrap(),
            Layer::dense((6, classes)),
        ],
        21,
    )
    .unwrap()
}

#[test]
fn accuracy_is_the_percentage_of_matches() {
    // 3 of the 10 labels are the class the scorer always picks
    let labels = vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 1];
    let dataset = indexed_dataset(2, labels, 3);
    let model = ConstantScorer::new(2, 3);

    let mut loader = DataLoader::sequential(&dataset, batch_size(4));
    let metrics = evaluate(&model, loader.iter()).unwrap();
    assert!((metrics.accuracy - 30.).abs() < 1e-4);
    assert!(metrics.loss >= 0.);
}

#[test]
fn evaluation_is_idempotent_and_read_only() {
    let dataset = noisy_dataset(25, 4, 3);
    let model = small_net(4, 3);
    let params = model.params().to_vec();

    let mut loader = DataLoader::sequential(&dataset, batch_size(8));
    let first = evaluate(&model, loader.iter()).unwrap();
    let second = evaluate(&model, loader.iter()).unwrap();

    assert_eq!(first, second);
    assert_eq!(model.params(), params.as_slice());
    assert!((0.0..=100.0).contains(&first.accuracy));
}

#[test]
fn evaluating_nothing_is_an_error() {
    let model = small_net(4, 3);
    let err = evaluate(&model, std::iter::empty::<Batch>()).unwrap_err();
    assert!(matches!(err, MlErr::InvalidInput(_)));
}

#[test]
fn ranking_partitions_every_example() {
    let dataset = noisy_dataset(30, 4, 3);
    let model = small_net(4, 3);

    let mut loader = DataLoader::sequential(&dataset, batch_size(7));
    let ranking = rank(&model, loader.iter()).unwrap();
    assert_eq!(ranking.total(), dataset.len());
    assert_eq!(ranking.good.len() + ranking.errors.len(), 30);

    for example in &ranking.good {
        assert_eq!(example.prediction, example.target);
        assert!((0.0..=1.0).contains(&example.score));
    }
    for example in &ranking.errors {
        assert_ne!(example.prediction, example.target);
        assert!((0.0..=1.0).contains(&example.score));
    }

    // the correct examples keep the order they were visited in
    let positions: Vec<usize> = ranking
        .good
        .iter()
        .map(|e| {
            dataset
                .inputs()
                .rows()
                .into_iter()
                .position(|row| row == e.input.view())
                .unwrap()
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let metrics = evaluate(&model, loader.iter()).unwrap();
    let expected = ranking.good.len() as f32 / 30. * 100.;
    assert!((metrics.accuracy - expected).abs() < 1e-4);
}

#[test]
fn test_runner_visits_the_dataset_in_order() {
    let dataset = indexed_dataset(2, vec![0; 10], 2);
    let model = ConstantScorer::new(2, 2);

    let accuracy = test(&model, &dataset, 4).unwrap();
    assert_eq!(accuracy, 100.);

    let seen = model.seen.borrow();
    let sizes: Vec<usize> = seen.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![4, 4, 2]);

    let visited: Vec<f32> = seen.concat();
    let expected: Vec<f32> = (0..10).map(|i| i as f32).collect();
    assert_eq!(visited, expected);
}

#[test]
fn test_runner_rejects_a_zero_batch_size() {
    let dataset = indexed_dataset(2, vec![0; 3], 2);
    let err = test(&ConstantScorer::new(2, 2), &dataset, 0).unwrap_err();
    assert!(matches!(err, MlErr::InvalidInput(_)));
}

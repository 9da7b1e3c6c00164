//! Reader for the binary release of CIFAR-10.
//!
//! Each batch file is a sequence of fixed size records: one label byte followed by the
//! 32x32 image as 3072 bytes, red plane first, then green, then blue. Pixel values are scaled
//! into `[0, 1]` and kept in that channel-first order.

use std::{fs, path::Path};

use log::debug;

use super::InMemoryDataset;
use crate::{MlErr, Result};

pub const CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Channels, height and width of every image.
pub const IMAGE_SHAPE: (usize, usize, usize) = (3, 32, 32);

pub const IMAGE_LEN: usize = IMAGE_SHAPE.0 * IMAGE_SHAPE.1 * IMAGE_SHAPE.2;

const RECORD_LEN: usize = 1 + IMAGE_LEN;

const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

const TEST_FILE: &str = "test_batch.bin";

/// Decodes the records held in `bytes` into flat pixel values and labels.
///
/// # Errors
/// `MlErr::Dataset` if `bytes` is not a whole number of records or a label is not a class.
pub fn decode_records(bytes: &[u8]) -> Result<(Vec<f32>, Vec<usize>)> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(MlErr::Dataset(format!(
            "{} bytes is not a whole number of {RECORD_LEN} byte records",
            bytes.len()
        )));
    }

    let n = bytes.len() / RECORD_LEN;
    let mut pixels = Vec::with_capacity(n * IMAGE_LEN);
    let mut labels = Vec::with_capacity(n);

    for (i, record) in bytes.chunks_exact(RECORD_LEN).enumerate() {
        let label = record[0] as usize;
        if label >= CLASS_NAMES.len() {
            return Err(MlErr::Dataset(format!("record {i} has label {label}")));
        }

        labels.push(label);
        pixels.extend(record[1..].iter().map(|&p| p as f32 / 255.));
    }

    Ok((pixels, labels))
}

/// Reads a single batch file into a dataset.
pub fn load_batch_file<P: AsRef<Path>>(path: P) -> Result<InMemoryDataset> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| MlErr::Dataset(format!("failed to read {}: {e}", path.display())))?;

    let (pixels, labels) = decode_records(&bytes)?;
    debug!(examples = labels.len(); "read cifar batch {}", path.display());

    InMemoryDataset::from_flat(pixels, IMAGE_LEN, labels, CLASS_NAMES.len())
}

/// Loads the training set (the five data batches, in order) and the test set from `dir`.
pub fn load_cifar10<P: AsRef<Path>>(dir: P) -> Result<(InMemoryDataset, InMemoryDataset)> {
    let dir = dir.as_ref();

    let mut pixels = Vec::new();
    let mut labels = Vec::new();
    for name in TRAIN_FILES {
        let path = dir.join(name);
        let bytes = fs::read(&path)
            .map_err(|e| MlErr::Dataset(format!("failed to read {}: {e}", path.display())))?;

        let (p, l) = decode_records(&bytes)?;
        pixels.extend(p);
        labels.extend(l);
    }

    let train = InMemoryDataset::from_flat(pixels, IMAGE_LEN, labels, CLASS_NAMES.len())?;
    let test = load_batch_file(dir.join(TEST_FILE))?;
    debug!(train = train.len(), test = test.len(); "loaded cifar10");

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![label];
        r.extend(std::iter::repeat_n(fill, IMAGE_LEN));
        r
    }

    #[test]
    fn decodes_and_scales() {
        let mut bytes = record(3, 255);
        bytes.extend(record(9, 0));

        let (pixels, labels) = decode_records(&bytes).unwrap();
        assert_eq!(labels, vec![3, 9]);
        assert_eq!(pixels.len(), 2 * IMAGE_LEN);
        assert_eq!(pixels[0], 1.);
        assert_eq!(pixels[IMAGE_LEN], 0.);
    }

    #[test]
    fn rejects_truncated_and_mislabeled_records() {
        let mut bytes = record(0, 1);
        bytes.pop();
        assert!(matches!(decode_records(&bytes), Err(MlErr::Dataset(_))));
        assert!(matches!(decode_records(&record(10, 0)), Err(MlErr::Dataset(_))));
    }

    #[test]
    fn loads_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in TRAIN_FILES.iter().enumerate() {
            fs::write(dir.path().join(name), record(i as u8, 0)).unwrap();
        }
        let mut test = record(7, 51);
        test.extend(record(8, 102));
        fs::write(dir.path().join(TEST_FILE), test).unwrap();

        let (train, test) = load_cifar10(dir.path()).unwrap();
        assert_eq!(train.labels(), &[0, 1, 2, 3, 4]);
        assert_eq!(test.labels(), &[7, 8]);
        assert_eq!(test.features(), IMAGE_LEN);
        assert!((test.inputs()[[0, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn missing_files_are_dataset_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_cifar10(dir.path()), Err(MlErr::Dataset(_))));
    }
}

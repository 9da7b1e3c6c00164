use std::{fmt::Write as _, fs::File, io::BufWriter, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// What happened during one epoch of training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_accuracy: f32,
    pub train_loss: f32,
    /// `None` when there was no validation split.
    pub val_accuracy: Option<f32>,
    pub val_loss: Option<f32>,
    /// Learning rate the optimizer used during the epoch.
    pub learning_rate: f32,
}

impl EpochRecord {
    /// The human readable summary of this epoch, given how long its training pass took.
    pub fn progress_line(&self, elapsed: Duration) -> String {
        let mut line = format!(
            "Epoch {} - Train acc: {:.2} - Val acc: ",
            self.epoch, self.train_accuracy
        );
        push_optional(&mut line, self.val_accuracy, 2);
        let _ = write!(line, " - Train loss: {:.4} - Val loss: ", self.train_loss);
        push_optional(&mut line, self.val_loss, 4);
        let _ = write!(line, " - Training time: {:.2}s", elapsed.as_secs_f32());
        line
    }
}

fn push_optional(line: &mut String, value: Option<f32>, precision: usize) {
    match value {
        Some(v) => {
            let _ = write!(line, "{v:.precision$}");
        }
        None => line.push_str("n/a"),
    }
}

/// Append-only log of the epochs completed so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<EpochRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    /// Amount of completed epochs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// The record with the highest validation accuracy, if any epoch was validated.
    pub fn best_val_accuracy(&self) -> Option<&EpochRecord> {
        self.records
            .iter()
            .filter_map(|r| r.val_accuracy.map(|acc| (acc, r)))
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, r)| r)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MlErr::Io(e.into()))
    }

    /// Writes the history as a JSON array of records, one per epoch.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(|e| MlErr::Io(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, val_accuracy: Option<f32>) -> EpochRecord {
        EpochRecord {
            epoch,
            train_accuracy: 50.,
            train_loss: 0.69314,
            val_accuracy,
            val_loss: val_accuracy.map(|_| 1.5),
            learning_rate: 0.01,
        }
    }

    #[test]
    fn progress_line_format() {
        let line = record(3, Some(41.256)).progress_line(Duration::from_millis(1500));
        assert_eq!(
            line,
            "Epoch 3 - Train acc: 50.00 - Val acc: 41.26 - Train loss: 0.6931 - Val loss: 1.5000 - Training time: 1.50s"
        );

        let line = record(0, None).progress_line(Duration::ZERO);
        assert!(line.contains("Val acc: n/a"));
        assert!(line.contains("Val loss: n/a"));
    }

    #[test]
    fn best_val_accuracy_skips_unvalidated_epochs() {
        let mut history = History::new();
        history.push(record(0, None));
        history.push(record(1, Some(30.)));
        history.push(record(2, Some(45.)));
        history.push(record(3, Some(40.)));

        assert_eq!(history.len(), 4);
        assert_eq!(history.best_val_accuracy().map(|r| r.epoch), Some(2));
    }

    #[test]
    fn json_round_trip() {
        let mut history = History::new();
        history.push(record(0, Some(10.)));
        history.push(record(1, None));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        history.write_json(&path).unwrap();

        let read: History = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read, history);
        assert!(history.to_json().unwrap().starts_with('['));
    }
}

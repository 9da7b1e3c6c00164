use std::time::Duration;

use log::info;

use super::EpochRecord;

/// Receives every epoch record as soon as it's appended to the history.
pub trait Progress {
    fn on_epoch(&mut self, record: &EpochRecord, elapsed: Duration);
}

/// Logs one line per epoch at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn on_epoch(&mut self, record: &EpochRecord, elapsed: Duration) {
        info!("{}", record.progress_line(elapsed));
    }
}

impl<F> Progress for F
where
    F: FnMut(&EpochRecord, Duration),
{
    fn on_epoch(&mut self, record: &EpochRecord, elapsed: Duration) {
        self(record, elapsed)
    }
}

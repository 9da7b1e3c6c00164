use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// Coarse classification of an `MlErr`, used to decide how a caller reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller handed in something unusable (empty batches, wrong shapes).
    InvalidInput,
    /// Training produced non-finite numbers, the parameters can't be trusted anymore.
    FatalTraining,
    /// A collaborator (file system, dataset files, checkpoints) failed.
    Collaborator,
}

/// The crate's error type.
#[derive(Debug)]
pub enum MlErr {
    InvalidInput(String),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    NonFiniteLoss {
        batch: usize,
        loss: f32,
    },
    NonFiniteGradient {
        batch: usize,
    },
    Io(io::Error),
    Checkpoint(String),
    Dataset(String),
}

impl MlErr {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MlErr::InvalidInput(_) | MlErr::SizeMismatch { .. } => ErrorKind::InvalidInput,
            MlErr::NonFiniteLoss { .. } | MlErr::NonFiniteGradient { .. } => {
                ErrorKind::FatalTraining
            }
            MlErr::Io(_) | MlErr::Checkpoint(_) | MlErr::Dataset(_) => ErrorKind::Collaborator,
        }
    }

    pub(crate) fn invalid_input<S: Into<String>>(msg: S) -> Self {
        MlErr::InvalidInput(msg.into())
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::NonFiniteLoss { batch, loss } => {
                write!(f, "loss became non-finite ({loss}) at batch {batch}")
            }
            MlErr::NonFiniteGradient { batch } => {
                write!(f, "gradient became non-finite at batch {batch}")
            }
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Checkpoint(msg) => write!(f, "bad checkpoint: {msg}"),
            MlErr::Dataset(msg) => write!(f, "bad dataset: {msg}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_classified() {
        assert_eq!(
            MlErr::invalid_input("empty").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            MlErr::NonFiniteLoss {
                batch: 3,
                loss: f32::NAN
            }
            .kind(),
            ErrorKind::FatalTraining
        );
        assert_eq!(
            MlErr::from(io::Error::other("disk")).kind(),
            ErrorKind::Collaborator
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = MlErr::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "io error: gone");
    }
}

use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::uniform::Error as UniformError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LabelOutOfRange {
        label: usize,
        classes: usize,
    },
    EmptyDataset,
    EmptyLoader {
        samples: usize,
        batch_size: usize,
    },
    InvalidDistribution(String),
    WorkerPool(String),
    Diverged {
        step: usize,
        loss: f32,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::LabelOutOfRange { label, classes } => write!(
                f,
                "Label {label} is out of range for a model with {classes} classes"
            ),
            MlErr::EmptyDataset => write!(f, "The dataset has no samples"),
            MlErr::EmptyLoader {
                samples,
                batch_size,
            } => write!(
                f,
                "A loader over {samples} samples with batch size {batch_size} dropping the last batch never yields a batch"
            ),
            MlErr::InvalidDistribution(msg) => write!(f, "Invalid distribution: {msg}"),
            MlErr::WorkerPool(msg) => write!(f, "Failed to start the loader workers: {msg}"),
            MlErr::Diverged { step, loss } => {
                write!(f, "Training diverged at step {step}, loss is {loss}")
            }
        }
    }
}

impl Error for MlErr {}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidDistribution(value.to_string())
    }
}

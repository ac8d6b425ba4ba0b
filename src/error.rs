use std::{fmt, io, path::PathBuf};

use machine_learning::MlErr;
use safetensors::SafeTensorError;

/// The result type used across the sweep harness.
pub type Result<T> = std::result::Result<T, SweepErr>;

/// All errors that can occur while preparing or running a sweep.
#[derive(Debug)]
pub enum SweepErr {
    /// Invalid configuration, caught before any run starts.
    InvalidConfig(String),
    /// A tabular input file could not be read or parsed as csv.
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    /// The label column is not present in a file's header.
    MissingLabel { path: PathBuf, label_key: String },
    /// A record holds a value that is not a number.
    InvalidRecord {
        path: PathBuf,
        line: u64,
        msg: String,
    },
    /// A tabular input file has a header but no records.
    EmptyFile { path: PathBuf },
    /// The feature width of a file disagrees with the target training file.
    FeatureMismatch {
        path: PathBuf,
        got: usize,
        expected: usize,
    },
    /// A file holds a label that the target training file never mentions.
    UnknownLabel { path: PathBuf, label: String },
    /// The target training file is too small to carve a validation split out of it.
    SplitTooSmall { samples: usize, fraction: f32 },
    /// A checkpoint file could not be encoded or decoded.
    Checkpoint {
        path: PathBuf,
        source: SafeTensorError,
    },
    /// A checkpoint does not hold the tensors the model expects.
    CheckpointMismatch { path: PathBuf, tensor: String },
    /// Validation accuracy never improved, so there is no best checkpoint to reload.
    NoCheckpoint { path: PathBuf },
    /// The configuration file is not valid json for a sweep.
    Json(serde_json::Error),
    /// A training or evaluation error.
    Ml(MlErr),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for SweepErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Csv { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::MissingLabel { path, label_key } => {
                write!(f, "{} has no label column named {label_key:?}", path.display())
            }
            Self::InvalidRecord { path, line, msg } => {
                write!(f, "{}:{line}: {msg}", path.display())
            }
            Self::EmptyFile { path } => write!(f, "{} has no records", path.display()),
            Self::FeatureMismatch {
                path,
                got,
                expected,
            } => write!(
                f,
                "{} has {got} feature columns, expected {expected}",
                path.display()
            ),
            Self::UnknownLabel { path, label } => write!(
                f,
                "{} holds label {label:?} which is absent from the target training set",
                path.display()
            ),
            Self::SplitTooSmall { samples, fraction } => write!(
                f,
                "cannot split {samples} samples into train and validation with fraction {fraction}"
            ),
            Self::Checkpoint { path, source } => {
                write!(f, "checkpoint {}: {source}", path.display())
            }
            Self::CheckpointMismatch { path, tensor } => write!(
                f,
                "checkpoint {} has no matching tensor {tensor:?}",
                path.display()
            ),
            Self::NoCheckpoint { path } => write!(
                f,
                "validation accuracy never improved, no checkpoint written at {}",
                path.display()
            ),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Ml(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for SweepErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            Self::Checkpoint { source, .. } => Some(source),
            Self::Json(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SweepErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SweepErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<MlErr> for SweepErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

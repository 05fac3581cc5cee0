//! Error types for fedsim.

use thiserror::Error;

use crate::core::types::ClientId;

/// Result type alias for fedsim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a federated simulation.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("invalid client count: {0}")]
    InvalidClientCount(usize),

    #[error("client fraction must be in (0, 1], got {0}")]
    InvalidClientFraction(f32),

    #[error("round count must be at least 1")]
    InvalidRounds,

    #[error("local epochs must be at least 1")]
    InvalidLocalEpochs,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("unrecognized dataset: {0}")]
    UnknownDataset(String),

    #[error("unrecognized model: {0}")]
    UnknownModel(String),

    #[error("dataset of {dataset_size} samples cannot fill {required} shards")]
    DatasetTooSmall {
        dataset_size: usize,
        required: usize,
    },

    #[error("cannot aggregate an empty set of snapshots")]
    EmptyAggregation,

    #[error("partition covers {covered} clients, {required} required")]
    PartitionMismatch { covered: usize, required: usize },

    // Data errors
    #[error("client {0} has an empty data partition")]
    EmptyPartition(ClientId),

    #[error("cannot evaluate over an empty dataset")]
    EmptyDataset,

    #[error("index {index} out of range for dataset of {dataset_size} samples")]
    IndexOutOfRange { index: usize, dataset_size: usize },

    #[error("feature and label counts differ: {features} vs {labels}")]
    LengthMismatch { features: usize, labels: usize },

    // Model mismatch errors
    #[error("snapshot is missing parameter: {0}")]
    MissingParameter(String),

    #[error("snapshot carries unexpected parameter: {0}")]
    UnexpectedParameter(String),

    #[error("parameter {name} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor data of {actual} elements does not fit shape {shape:?}")]
    TensorShape { shape: Vec<usize>, actual: usize },

    // Serialization errors
    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error stems from invalid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidClientCount(_)
                | Error::InvalidClientFraction(_)
                | Error::InvalidRounds
                | Error::InvalidLocalEpochs
                | Error::InvalidBatchSize
                | Error::UnknownDataset(_)
                | Error::UnknownModel(_)
                | Error::DatasetTooSmall { .. }
                | Error::EmptyAggregation
                | Error::PartitionMismatch { .. }
        )
    }

    /// Whether this error signals a structural snapshot/model incompatibility.
    pub fn is_model_mismatch(&self) -> bool {
        matches!(
            self,
            Error::MissingParameter(_)
                | Error::UnexpectedParameter(_)
                | Error::ShapeMismatch { .. }
                | Error::TensorShape { .. }
        )
    }

    /// Whether this error stems from bad or missing data.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Error::EmptyPartition(_)
                | Error::EmptyDataset
                | Error::IndexOutOfRange { .. }
                | Error::LengthMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

//! Error types for mixed-kernel SVM estimation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Unrecognized kernel: {0}")]
    UnrecognizedKernel(String),

    #[error("Category {value} of feature {feature} was not observed in training data")]
    UnseenCategory { feature: usize, value: u32 },

    #[error("Invalid value for feature {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(f64),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Optimization failed: {0}")]
    OptimizationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;

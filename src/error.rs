//! Error types for the furlong engine

use thiserror::Error;

/// Result type alias for furlong operations
pub type Result<T> = std::result::Result<T, FurlongError>;

/// Main error type for the furlong engine
#[derive(Error, Debug)]
pub enum FurlongError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Degenerate feature (zero variance in training data): {0}")]
    DegenerateFeature(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for FurlongError {
    fn from(err: polars::error::PolarsError) -> Self {
        FurlongError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FurlongError {
    fn from(err: serde_json::Error) -> Self {
        FurlongError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FurlongError {
    fn from(err: ndarray::ShapeError) -> Self {
        FurlongError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

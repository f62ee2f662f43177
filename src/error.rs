//! Error types for atlasnet.

use thiserror::Error;

/// Errors raised while building or running an Atlasnet.
#[derive(Error, Debug)]
pub enum AtlasnetError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Mesh generation only works on a single latent vector.
    #[error("mesh generation needs a batch of exactly one latent vector, got {got}")]
    UnsupportedBatchSize {
        /// Batch size that was supplied.
        got: usize,
    },

    /// Tensor data could not be read back from the device.
    #[error("tensor data error: {0}")]
    TensorData(String),

    /// Reading or writing an artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Latent file is not a JSON array of numbers.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Host array has the wrong layout.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Model weights could not be loaded.
    #[error("record error: {0}")]
    Record(String),

    /// Model config could not be loaded.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for atlasnet operations.
pub type Result<T> = std::result::Result<T, AtlasnetError>;

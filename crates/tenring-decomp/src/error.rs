//! Error types for tensor-ring decomposition

use scirs2_linalg::LinalgError;
use tenring_ooc::StorageError;
use thiserror::Error;

/// Errors raised by the sampled TR-ALS solver
///
/// Configuration variants are returned before any sampling or storage
/// access takes place.
#[derive(Error, Debug)]
pub enum TrError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid ranks: {0}")]
    InvalidRanks(String),

    #[error("Invalid embedding dimensions: {0}")]
    InvalidEmbedding(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Sampling distribution for mode {0} is not initialised")]
    UninitializedDistribution(usize),

    #[error("Zero sampling probability drawn at index {index} of mode {mode}")]
    DegenerateProbability { mode: usize, index: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Linear algebra error: {0}")]
    Linalg(#[from] LinalgError),
}

/// Result type for TR operations
pub type TrResult<T> = Result<T, TrError>;

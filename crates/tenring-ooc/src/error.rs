//! Error types for storage access

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a tensor from memory or persistent storage
///
/// `Io` and `InvalidFormat` are fatal for a decomposition run. `OutOfMemory`
/// is raised only when materialising a buffer fails to allocate, so callers
/// can choose to skip optional full-tensor work.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tensor file {}: {reason}", .path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid mode {mode} for tensor with {n_modes} modes")]
    InvalidMode { mode: usize, n_modes: usize },

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Cannot allocate buffer for {elements} elements")]
    OutOfMemory { elements: usize },

    #[error("Tensor construction failed: {0}")]
    Tensor(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only reports a failed allocation
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, StorageError::OutOfMemory { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Allocate an empty buffer able to hold `elements` values without aborting on OOM
pub(crate) fn try_buffer<T>(elements: usize) -> StorageResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(elements)
        .map_err(|_| StorageError::OutOfMemory { elements })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_display_contains_path() {
        let err = StorageError::io(
            "/tmp/missing.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.bin"));
        assert!(msg.contains("gone"));
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn test_try_buffer_overflow_is_oom() {
        let err = try_buffer::<f64>(usize::MAX).unwrap_err();
        assert!(err.is_out_of_memory());
    }

    #[test]
    fn test_try_buffer_small() {
        let buf = try_buffer::<f64>(16).unwrap();
        assert!(buf.capacity() >= 16);
        assert!(buf.is_empty());
    }
}

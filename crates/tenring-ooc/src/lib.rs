//! # tenring-ooc
//!
//! Storage adapters for TenRing.
//!
//! The sampled tensor-ring solver reads its data tensor only through the
//! [`TensorSource`] trait, which has two implementations:
//!
//! - [`DenseND<f64>`](tenring_core::DenseND): the tensor is resident in memory
//! - [`DiskSource`]: the tensor lives in a binary tensor file (see
//!   [`mmap_io`]) and is read in contiguous slabs along the target mode
//!
//! This crate provides:
//! - Memory-mapped binary tensor files ([`MmapTensor`], [`write_tensor_binary`])
//! - Deterministic mode chunking ([`ModeChunks`])
//! - Structured logging setup ([`tracing_support`])
//!
//! # Example
//!
//! ```ignore
//! use scirs2_core::ndarray_ext::array;
//! use tenring_ooc::{write_tensor_binary, DiskSource, TensorSource};
//!
//! write_tensor_binary("x.bin", &tensor)?;
//! let disk = DiskSource::open("x.bin")?;
//!
//! // Fibers along mode 1 at (i0, *, i2) for two samples, read in 4 slabs
//! let samples = array![[0usize, 0, 3], [2, 0, 1]];
//! let fibers = disk.fetch_mode_fibers(1, samples.view(), 4)?;
//! ```

pub mod chunking;
pub mod error;
pub mod mmap_io;
pub mod source;
pub mod tracing_support;

#[cfg(test)]
mod property_tests;

// Re-exports
pub use chunking::ModeChunks;
pub use error::{StorageError, StorageResult};
pub use mmap_io::{read_tensor_binary, write_tensor_binary, MmapTensor};
pub use source::{validate_samples, DiskSource, TensorSource};
pub use tracing_support::{init_tracing, record_slab_read, LogFormat, TracingConfig};

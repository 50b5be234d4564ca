//! # tenring-core
//!
//! Core tensor types and index arithmetic for TenRing.
//!
//! This crate provides the building blocks shared by the storage adapter
//! (`tenring-ooc`) and the sampled tensor-ring solver (`tenring-decomp`):
//!
//! - **Dense tensor representation** ([`DenseND`]) in row-major layout
//! - **Index mapping** ([`LinearIndexer`]) between multi-indices and linear offsets
//!
//! ## Memory Layout
//!
//! Tensors are always stored C-contiguous (row-major). Every constructor
//! normalises its input, so [`DenseND::as_slice`] never fails and linear
//! offsets computed by [`LinearIndexer`] address the flat storage directly.
//!
//! ## Quick Start
//!
//! ```
//! use tenring_core::{DenseND, LinearIndexer};
//!
//! let data: Vec<f64> = (0..24).map(|x| x as f64).collect();
//! let tensor = DenseND::from_vec(data, &[2, 3, 4]).unwrap();
//! assert_eq!(tensor.shape(), &[2, 3, 4]);
//!
//! let indexer = LinearIndexer::new(tensor.shape());
//! let offset = indexer.linear(&[1, 2, 3]).unwrap();
//! assert_eq!(tensor.as_slice()[offset], 23.0);
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return `anyhow::Result`:
//!
//! ```
//! use tenring_core::DenseND;
//!
//! let result = DenseND::<f64>::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]);
//! assert!(result.is_err());
//! ```

pub mod dense;
pub mod index;


pub use dense::DenseND;
pub use index::LinearIndexer;

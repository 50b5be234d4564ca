//! # TenRing - Sampled Tensor Ring Decomposition
//!
//! This is the **meta crate** that re-exports all TenRing components for
//! convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use tenring::prelude::*;
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let tensor = TrDecomp::random(&[8, 8, 8], &[2, 2, 2], 1.0, &mut rng)?.reconstruct()?;
//!
//! let config = TrAlsConfig::new().tol(0.0).max_iters(5).seed(3);
//! let result = tr_als_sampled(&tensor, &[2, 2, 2], &[40, 40, 40], &config)?;
//! assert_eq!(result.decomp.cores.len(), 3);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Core Types ([`core`])
//!
//! Row-major dense tensors and multi-index arithmetic.
//!
//! ```
//! use tenring::core::{DenseND, LinearIndexer};
//!
//! let tensor = DenseND::<f64>::zeros(&[2, 3, 4]);
//! let indexer = LinearIndexer::new(tensor.shape());
//! assert_eq!(indexer.linear(&[1, 0, 2]), Some(14));
//! ```
//!
//! ### Storage ([`ooc`])
//!
//! The [`ooc::TensorSource`] trait and its in-memory and file-backed
//! implementations, binary tensor files, and `tracing` setup.
//!
//! ### Decomposition ([`decomp`])
//!
//! Tensor Ring cores, leverage-score sampling, sketch construction and the
//! sampled ALS driver.

pub use tenring_core as core;
pub use tenring_decomp as decomp;
pub use tenring_ooc as ooc;

pub mod prelude {
    //! Prelude module for convenient imports

    // Core types
    pub use crate::core::{DenseND, LinearIndexer};

    // Storage
    pub use crate::ooc::{DiskSource, StorageError, TensorSource};

    // Decomposition
    pub use crate::decomp::{
        tr_als_sampled, tr_als_sampled_with_cores, AlsStatus, StorageIncrements, TrAlsConfig,
        TrAlsResult, TrAlsSession, TrDecomp, TrError,
    };
}

//! # tenring-decomp - Sampled Tensor Ring Decomposition
//!
//! Tensor Ring (TR) decomposition of large N-way tensors by alternating
//! least squares with leverage-score sampling.
//!
//! ## Overview
//!
//! A TR decomposition represents a tensor as a cyclic chain of 3-way cores:
//!
//! ```text
//! X(i₀,...,i_{N-1}) = trace(G₀[i₀] × G₁[i₁] × ... × G_{N-1}[i_{N-1}])
//! ```
//!
//! Core `n` has shape `(r_{n-1}, Iₙ, rₙ)` with the ring closed by
//! `r_{-1} = r_{N-1}`.
//!
//! Plain ALS for core `n` solves a least-squares problem with one row per
//! multi-index of the other modes, which is out of reach for large tensors.
//! This crate instead solves a small sketch of that problem:
//!
//! - rows are drawn i.i.d. from per-mode distributions proportional to the
//!   squared slice mass of the current cores ([`sampling`])
//! - only the sampled rows of the design matrix are built, as chain products
//!   of core slices, and the matching fibers are fetched from the data
//!   ([`sketch`])
//! - both sides are importance-reweighted and solved for the minimum-norm
//!   least-squares update ([`lstsq`])
//! - [`TrAlsSession`] sweeps over the modes with full or partial resampling
//!   until the relative error settles ([`als`])
//!
//! The data tensor is accessed through [`tenring_ooc::TensorSource`], so the
//! same solver runs on in-memory tensors and on binary tensor files read in
//! slabs.
//!
//! ## Quick Start
//!
//! ```
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//! use tenring_decomp::{tr_als_sampled, TrAlsConfig, TrDecomp};
//!
//! // Exact TR-rank (2, 2, 2) tensor
//! let mut rng = StdRng::seed_from_u64(0);
//! let truth = TrDecomp::random(&[10, 10, 10], &[2, 2, 2], 1.0, &mut rng)?;
//! let tensor = truth.reconstruct()?;
//!
//! let config = TrAlsConfig::new().tol(0.0).max_iters(10).seed(42);
//! let result = tr_als_sampled(&tensor, &[2, 2, 2], &[60, 60, 60], &config)?;
//!
//! assert_eq!(result.iters, 10);
//! assert_eq!(result.decomp.cores[1].shape(), &[2, 10, 2]);
//! println!("error: {:.2e}", result.decomp.relative_error(&tensor)?);
//! # Ok::<(), tenring_decomp::TrError>(())
//! ```
//!
//! ### Out-of-core data
//!
//! ```ignore
//! use tenring_ooc::DiskSource;
//! use tenring_decomp::{tr_als_sampled, StorageIncrements, TrAlsConfig};
//!
//! let source = DiskSource::open("tensor.bin")?;
//! let config = TrAlsConfig::new()
//!     .tol(0.0) // skip the full-tensor error check
//!     .storage_increments(StorageIncrements::Uniform(8));
//! let result = tr_als_sampled(&source, &[5, 5, 5, 5], &[500; 4], &config)?;
//! ```
//!
//! ## Choosing embedding dimensions
//!
//! The sketch for core `n` has `R = r_{n-1}·rₙ` unknowns per column. An
//! embedding dimension `Jₙ` well above `R` is needed for a reliable update;
//! smaller values are accepted with a warning and yield a minimum-norm
//! solution.
//!
//! ## Error Check
//!
//! With `tol > 0` every sweep reconstructs the full tensor and reads the
//! whole data tensor, which needs memory for both. If the data cannot be
//! materialised the check is switched off with a warning and the run
//! continues to `max_iters`.
//!
//! ## Features
//!
//! - `parallel` (default): compute sampled design rows on the rayon pool

pub mod als;
pub mod config;
pub mod error;
pub mod lstsq;
pub mod sampling;
pub mod sketch;
pub mod tr;


// Re-exports
pub use als::{tr_als_sampled, tr_als_sampled_with_cores, AlsStatus, TrAlsResult, TrAlsSession};
pub use config::{StorageIncrements, TrAlsConfig};
pub use error::{TrError, TrResult};
pub use lstsq::{min_norm_lstsq, LstsqSolution};
pub use sampling::{ModeDistribution, SamplingTracker};
pub use sketch::{build_sketch, rescaling_weights, sampled_design_matrix, SampleSet, Sketch};
pub use tr::{core_fold_mode2, core_unfold_mode2, left_rank, TrDecomp};

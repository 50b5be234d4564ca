//! Tensor Ring representation
//!
//! A Tensor Ring (TR) decomposition represents an N-way tensor as a cyclic
//! chain of 3-way cores:
//!
//! X(i₀, i₁, ..., i_{N-1}) = trace(G₀\[i₀\] × G₁\[i₁\] × ... × G_{N-1}\[i_{N-1}\])
//!
//! Where:
//! - Gₙ is a TR-core with shape (r_{n-1}, Iₙ, rₙ)
//! - the rank indices wrap: the left rank of G₀ is r_{N-1}
//!
//! `ranks[n]` is always the *right* rank of core `n`.
//!
//! # Helpers
//!
//! [`core_unfold_mode2`] and [`core_fold_mode2`] convert between a core and
//! its middle-axis unfolding `(Iₙ, r_{n-1}·rₙ)`, the layout used by the
//! sampled least-squares update.

use crate::error::{TrError, TrResult};
use scirs2_core::ndarray_ext::{Array2, Array3, ArrayView2, Axis};
use scirs2_core::random::{rngs::StdRng, Distribution, RandNormal as Normal};
use tenring_core::DenseND;

/// Left rank of core `mode` in a ring with the given right ranks
pub fn left_rank(ranks: &[usize], mode: usize) -> usize {
    let n_modes = ranks.len();
    ranks[(mode + n_modes - 1) % n_modes]
}

/// Tensor Ring decomposition
#[derive(Debug, Clone)]
pub struct TrDecomp {
    /// TR-cores: core `n` has shape (r_{n-1}, I_n, r_n)
    pub cores: Vec<Array3<f64>>,

    /// Right rank of every core
    pub ranks: Vec<usize>,

    /// Shape of the represented tensor
    pub shape: Vec<usize>,
}

impl TrDecomp {
    /// Random Gaussian cores with standard deviation `std`
    ///
    /// # Errors
    ///
    /// - [`TrError::InvalidRanks`] when `ranks` and `shape` differ in length or
    ///   any rank is zero
    /// - [`TrError::InvalidConfig`] for a non-positive `std`
    pub fn random(shape: &[usize], ranks: &[usize], std: f64, rng: &mut StdRng) -> TrResult<Self> {
        check_ranks(shape, ranks)?;
        let normal = Normal::new(0.0, std)
            .map_err(|e| TrError::InvalidConfig(format!("init std {}: {}", std, e)))?;

        let cores = (0..shape.len())
            .map(|n| {
                let dims = (left_rank(ranks, n), shape[n], ranks[n]);
                Array3::from_shape_fn(dims, |_| normal.sample(&mut *rng))
            })
            .collect();

        Ok(Self {
            cores,
            ranks: ranks.to_vec(),
            shape: shape.to_vec(),
        })
    }

    /// Build a decomposition from existing cores, checking ring closure
    ///
    /// Cores are normalised to standard layout.
    pub fn from_cores(cores: Vec<Array3<f64>>) -> TrResult<Self> {
        let n_modes = cores.len();
        if n_modes == 0 {
            return Err(TrError::InvalidRanks("no cores given".to_string()));
        }

        let ranks: Vec<usize> = cores.iter().map(|c| c.shape()[2]).collect();
        let shape: Vec<usize> = cores.iter().map(|c| c.shape()[1]).collect();

        for (n, core) in cores.iter().enumerate() {
            let expected = left_rank(&ranks, n);
            if core.shape()[0] != expected {
                return Err(TrError::InvalidRanks(format!(
                    "core {} has left rank {}, previous core has right rank {}",
                    n,
                    core.shape()[0],
                    expected
                )));
            }
        }
        check_ranks(&shape, &ranks)?;

        let cores = cores
            .into_iter()
            .map(|c| c.as_standard_layout().into_owned())
            .collect();

        Ok(Self {
            cores,
            ranks,
            shape,
        })
    }

    /// Number of modes
    pub fn n_modes(&self) -> usize {
        self.cores.len()
    }

    /// Expected shape (r_{n-1}, I_n, r_n) of core `mode`
    pub fn core_shape(&self, mode: usize) -> (usize, usize, usize) {
        (left_rank(&self.ranks, mode), self.shape[mode], self.ranks[mode])
    }

    /// Evaluate a single entry as the trace of the chain of core slices
    ///
    /// Returns `None` when the index is out of bounds.
    pub fn entry(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.n_modes() || index.iter().zip(&self.shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        let mut chain = self.cores[0].index_axis(Axis(1), index[0]).to_owned();
        for (core, &i) in self.cores.iter().zip(index).skip(1) {
            chain = chain.dot(&core.index_axis(Axis(1), i));
        }
        Some(chain.diag().sum())
    }

    /// Reconstruct the full tensor
    ///
    /// Contracts the cores left to right keeping the open ring index, then
    /// takes the trace over it.
    ///
    /// # Complexity
    ///
    /// Time: O(∏ᵢ Iᵢ × R³), Space: O(∏ᵢ Iᵢ × R²) where R = max TR-rank
    pub fn reconstruct(&self) -> TrResult<DenseND<f64>> {
        let n_modes = self.n_modes();
        let (r_ring, i_0, r_0) = self.core_shape(0);

        // acc holds (r_ring, P, r_k) flattened to (r_ring * P, r_k)
        let mut acc = self.cores[0]
            .view()
            .into_shape_with_order((r_ring * i_0, r_0))
            .map_err(|e| TrError::ShapeMismatch(format!("core 0 reshape failed: {}", e)))?
            .to_owned();

        for k in 1..n_modes {
            let (r_left, i_k, r_right) = self.core_shape(k);
            let core_2d = self.cores[k]
                .view()
                .into_shape_with_order((r_left, i_k * r_right))
                .map_err(|e| TrError::ShapeMismatch(format!("core {} reshape failed: {}", k, e)))?;

            let rows = acc.nrows();
            acc = acc
                .dot(&core_2d)
                .into_shape_with_order((rows * i_k, r_right))
                .map_err(|e| TrError::ShapeMismatch(format!("contraction reshape failed: {}", e)))?;
        }

        let total: usize = self.shape.iter().product();
        let data: Vec<f64> = (0..total)
            .map(|p| (0..r_ring).map(|a| acc[[a * total + p, a]]).sum())
            .collect();

        DenseND::from_vec(data, &self.shape).map_err(|e| TrError::ShapeMismatch(e.to_string()))
    }

    /// Relative Frobenius error ‖X - X̂‖ / ‖X‖ against `reference`
    pub fn relative_error(&self, reference: &DenseND<f64>) -> TrResult<f64> {
        if reference.shape() != self.shape.as_slice() {
            return Err(TrError::ShapeMismatch(format!(
                "decomposition shape {:?} vs tensor shape {:?}",
                self.shape,
                reference.shape()
            )));
        }
        self.reconstruct()?
            .relative_distance(reference)
            .map_err(|e| TrError::ShapeMismatch(e.to_string()))
    }

    /// Total number of stored core entries
    pub fn num_parameters(&self) -> usize {
        self.cores.iter().map(|c| c.len()).sum()
    }

    /// Ratio of dense tensor size to core storage
    pub fn compression_ratio(&self) -> f64 {
        let original: usize = self.shape.iter().product();
        original as f64 / self.num_parameters() as f64
    }
}

fn check_ranks(shape: &[usize], ranks: &[usize]) -> TrResult<()> {
    if shape.len() != ranks.len() {
        return Err(TrError::InvalidRanks(format!(
            "{} ranks for a {}-way tensor",
            ranks.len(),
            shape.len()
        )));
    }
    if shape.is_empty() {
        return Err(TrError::InvalidRanks("tensor has no modes".to_string()));
    }
    if let Some(n) = ranks.iter().position(|&r| r == 0) {
        return Err(TrError::InvalidRanks(format!("rank {} is zero", n)));
    }
    Ok(())
}

/// Unfold a core (r_left, I, r_right) along its middle axis
///
/// Entry `[i, a * r_right + b]` of the result is `core[a, i, b]`.
pub fn core_unfold_mode2(core: &Array3<f64>) -> Array2<f64> {
    let (r_left, size, r_right) = core.dim();
    Array2::from_shape_fn((size, r_left * r_right), |(i, c)| {
        core[[c / r_right, i, c % r_right]]
    })
}

/// Inverse of [`core_unfold_mode2`]
///
/// `unfolded` has shape `(I, r_left * r_right)`.
pub fn core_fold_mode2(
    unfolded: ArrayView2<'_, f64>,
    r_left: usize,
    r_right: usize,
) -> TrResult<Array3<f64>> {
    if unfolded.ncols() != r_left * r_right {
        return Err(TrError::ShapeMismatch(format!(
            "unfolding has {} columns, expected {} x {}",
            unfolded.ncols(),
            r_left,
            r_right
        )));
    }
    Ok(Array3::from_shape_fn(
        (r_left, unfolded.nrows(), r_right),
        |(a, i, b)| unfolded[[i, a * r_right + b]],
    ))
}

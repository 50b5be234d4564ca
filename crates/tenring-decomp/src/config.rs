//! Run configuration for sampled TR-ALS

use crate::error::{TrError, TrResult};

/// Chunking factor for persistent-storage fiber fetches
///
/// `0` means a single read along the target mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageIncrements {
    /// Same number of increments for every mode
    Uniform(usize),
    /// One entry per mode
    PerMode(Vec<usize>),
}

impl StorageIncrements {
    /// Number of increments to use when fetching fibers along `mode`
    pub fn for_mode(&self, mode: usize) -> usize {
        match self {
            StorageIncrements::Uniform(k) => *k,
            StorageIncrements::PerMode(per_mode) => per_mode.get(mode).copied().unwrap_or(0),
        }
    }
}

impl Default for StorageIncrements {
    fn default() -> Self {
        StorageIncrements::Uniform(0)
    }
}

/// Configuration for [`crate::tr_als_sampled`]
///
/// # Example
///
/// ```
/// use tenring_decomp::{StorageIncrements, TrAlsConfig};
///
/// let config = TrAlsConfig::new()
///     .tol(0.0)
///     .max_iters(20)
///     .resample(false)
///     .storage_increments(StorageIncrements::Uniform(4))
///     .seed(7);
/// assert!(config.validate(3).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TrAlsConfig {
    /// Convergence threshold on the change of relative error (default: 1e-3)
    ///
    /// Values `<= 0` skip the error check and run exactly `max_iters` sweeps.
    pub tol: f64,
    /// Maximum number of outer sweeps (default: 50)
    pub max_iters: usize,
    /// Resample every other mode at each step (default: true)
    ///
    /// When false only the mode updated in the previous step is redrawn.
    pub resample: bool,
    /// Log per-sweep progress at info level (default: false)
    pub verbose: bool,
    /// Chunking of persistent-storage fetches (default: single read)
    pub storage_increments: StorageIncrements,
    /// Seed for initialisation and sampling (default: entropy)
    pub seed: Option<u64>,
    /// Standard deviation of the Gaussian core initialisation (default: 1.0)
    pub init_std: f64,
}

impl Default for TrAlsConfig {
    fn default() -> Self {
        Self {
            tol: 1e-3,
            max_iters: 50,
            resample: true,
            verbose: false,
            storage_increments: StorageIncrements::default(),
            seed: None,
            init_std: 1.0,
        }
    }
}

impl TrAlsConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence threshold
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the maximum number of sweeps
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Choose full (`true`) or partial (`false`) resampling
    pub fn resample(mut self, resample: bool) -> Self {
        self.resample = resample;
        self
    }

    /// Enable or disable info-level progress logging
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the storage chunking factor
    pub fn storage_increments(mut self, increments: StorageIncrements) -> Self {
        self.storage_increments = increments;
        self
    }

    /// Fix the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the standard deviation used for random core initialisation
    pub fn init_std(mut self, std: f64) -> Self {
        self.init_std = std;
        self
    }

    /// Whether the per-sweep error check is enabled
    pub fn checks_error(&self) -> bool {
        self.tol > 0.0
    }

    /// Check the configuration for an `n_modes`-way tensor
    pub fn validate(&self, n_modes: usize) -> TrResult<()> {
        if self.max_iters == 0 {
            return Err(TrError::InvalidConfig("max_iters must be positive".to_string()));
        }
        if !self.tol.is_finite() {
            return Err(TrError::InvalidConfig(format!("tol must be finite, got {}", self.tol)));
        }
        if !(self.init_std.is_finite() && self.init_std > 0.0) {
            return Err(TrError::InvalidConfig(format!(
                "init_std must be positive and finite, got {}",
                self.init_std
            )));
        }
        if let StorageIncrements::PerMode(per_mode) = &self.storage_increments {
            if per_mode.len() != n_modes {
                return Err(TrError::InvalidConfig(format!(
                    "storage_increments has {} entries for a {}-way tensor",
                    per_mode.len(),
                    n_modes
                )));
            }
        }
        Ok(())
    }
}

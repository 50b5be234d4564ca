//! Sampled alternating least squares driver
//!
//! [`TrAlsSession`] owns all state of one decomposition run: the cores, the
//! sampling distributions, the persisted sample buffer, the previous error
//! and the random generator. Independent sessions share nothing, so several
//! runs can proceed side by side.
//!
//! One sweep updates every core once, in mode order. For mode `n`:
//!
//! 1. draw samples for the other modes (all of them under full resampling,
//!    only mode `n-1` under partial resampling)
//! 2. build the rescaled sketch and solve it with [`min_norm_lstsq`]
//! 3. fold the solution into core `n` and refresh its distribution
//!
//! With a positive tolerance the relative error against the full tensor is
//! computed after each sweep, and the run stops once it changes by less than
//! `tol`.

use crate::config::TrAlsConfig;
use crate::error::{TrError, TrResult};
use crate::lstsq::min_norm_lstsq;
use crate::sampling::SamplingTracker;
use crate::sketch::{build_sketch, SampleSet};
use crate::tr::{core_fold_mode2, TrDecomp};
use scirs2_core::random::{rngs::StdRng, thread_rng, SeedableRng};
use tenring_ooc::TensorSource;

/// State of the outer iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlsStatus {
    /// Sweeps remain and the stopping rule has not fired
    Running,
    /// The relative error changed by less than `tol`
    Converged,
    /// `max_iters` sweeps were run
    MaxItersReached,
}

/// Output of a completed run
#[derive(Debug, Clone)]
pub struct TrAlsResult {
    /// Final decomposition
    pub decomp: TrDecomp,
    /// Number of sweeps performed
    pub iters: usize,
    /// Terminal status
    pub status: AlsStatus,
    /// Relative error after each checked sweep (empty when the check is off)
    pub error_history: Vec<f64>,
}

/// Explicit state of one sampled TR-ALS run
pub struct TrAlsSession<'s, S: TensorSource + ?Sized> {
    source: &'s S,
    config: TrAlsConfig,
    embedding_dims: Vec<usize>,
    decomp: TrDecomp,
    tracker: SamplingTracker,
    samples: SampleSet,
    samples_drawn: bool,
    rng: StdRng,
    prev_error: Option<f64>,
    error_check: bool,
    error_history: Vec<f64>,
    underdetermined_warned: Vec<bool>,
    iters: usize,
    status: AlsStatus,
}

impl<'s, S: TensorSource + ?Sized> TrAlsSession<'s, S> {
    /// Start a run from random Gaussian cores
    ///
    /// All arguments are validated before any sampling or storage access.
    pub fn new(
        source: &'s S,
        ranks: &[usize],
        embedding_dims: &[usize],
        config: TrAlsConfig,
    ) -> TrResult<Self> {
        let shape = source.shape().to_vec();
        validate_inputs(&shape, ranks, embedding_dims, &config)?;

        let mut rng = make_rng(config.seed);
        let decomp = TrDecomp::random(&shape, ranks, config.init_std, &mut rng)?;
        Ok(Self::assemble(source, decomp, embedding_dims, config, rng))
    }

    /// Start a run from caller-supplied cores
    pub fn with_cores(
        source: &'s S,
        init: TrDecomp,
        embedding_dims: &[usize],
        config: TrAlsConfig,
    ) -> TrResult<Self> {
        if init.shape.as_slice() != source.shape() {
            return Err(TrError::ShapeMismatch(format!(
                "initial cores describe {:?}, tensor has shape {:?}",
                init.shape,
                source.shape()
            )));
        }
        validate_inputs(&init.shape, &init.ranks, embedding_dims, &config)?;
        if init.cores.len() != init.shape.len() {
            return Err(TrError::ShapeMismatch(format!(
                "{} cores for a {}-way decomposition",
                init.cores.len(),
                init.shape.len()
            )));
        }
        for (n, core) in init.cores.iter().enumerate() {
            if core.dim() != init.core_shape(n) {
                return Err(TrError::ShapeMismatch(format!(
                    "core {} has shape {:?}, ranks require {:?}",
                    n,
                    core.dim(),
                    init.core_shape(n)
                )));
            }
        }

        let rng = make_rng(config.seed);
        Ok(Self::assemble(source, init, embedding_dims, config, rng))
    }

    fn assemble(
        source: &'s S,
        decomp: TrDecomp,
        embedding_dims: &[usize],
        config: TrAlsConfig,
        rng: StdRng,
    ) -> Self {
        let n_modes = decomp.n_modes();
        let j_max = embedding_dims.iter().copied().max().unwrap_or(0);
        let tracker = SamplingTracker::initialize(&decomp.cores);
        let error_check = config.checks_error();

        Self {
            source,
            embedding_dims: embedding_dims.to_vec(),
            decomp,
            tracker,
            samples: SampleSet::new(j_max, n_modes),
            samples_drawn: false,
            rng,
            prev_error: None,
            error_check,
            error_history: Vec::new(),
            underdetermined_warned: vec![false; n_modes],
            iters: 0,
            status: AlsStatus::Running,
            config,
        }
    }

    /// Current decomposition
    pub fn decomp(&self) -> &TrDecomp {
        &self.decomp
    }

    /// Current sampling distributions
    pub fn tracker(&self) -> &SamplingTracker {
        &self.tracker
    }

    /// Sweeps completed so far
    pub fn iters(&self) -> usize {
        self.iters
    }

    /// Current status
    pub fn status(&self) -> AlsStatus {
        self.status
    }

    /// Relative errors recorded so far
    pub fn error_history(&self) -> &[f64] {
        &self.error_history
    }

    /// Whether the per-sweep error check is still active
    ///
    /// It is switched off for the rest of the run if the full tensor cannot
    /// be materialised.
    pub fn error_check_enabled(&self) -> bool {
        self.error_check
    }

    /// Refresh the sample buffer for a step on `mode`
    fn draw_samples(&mut self, mode: usize) -> TrResult<()> {
        let n_modes = self.decomp.n_modes();
        let j = self.embedding_dims[mode];

        if self.config.resample {
            for m in (0..n_modes).filter(|&m| m != mode) {
                let draws = self.tracker.sample(m, j, &mut self.rng)?;
                self.samples.refresh_mode(m, &draws)?;
            }
        } else {
            let j_max = self.samples.n_rows();
            if !self.samples_drawn {
                for m in (0..n_modes).filter(|&m| m != mode) {
                    let draws = self.tracker.sample(m, j_max, &mut self.rng)?;
                    self.samples.refresh_mode(m, &draws)?;
                }
                self.samples_drawn = true;
            } else {
                let previous = (mode + n_modes - 1) % n_modes;
                let draws = self.tracker.sample(previous, j_max, &mut self.rng)?;
                self.samples.refresh_mode(previous, &draws)?;
            }
        }
        Ok(())
    }

    /// Replace core `mode` with its sampled least-squares update
    pub fn update_mode(&mut self, mode: usize) -> TrResult<()> {
        let (r_left, _, r_right) = self.decomp.core_shape(mode);
        let j = self.embedding_dims[mode];

        if j < r_left * r_right && !self.underdetermined_warned[mode] {
            tracing::warn!(
                mode,
                embedding = j,
                unknowns = r_left * r_right,
                "embedding dimension below core rank product, sketch is underdetermined"
            );
            self.underdetermined_warned[mode] = true;
        }

        self.draw_samples(mode)?;

        let sketch = build_sketch(
            mode,
            &self.decomp.cores,
            &self.tracker,
            self.samples.rows(j),
            self.source,
            self.config.storage_increments.for_mode(mode),
        )?;

        let solved = min_norm_lstsq(&sketch.design.view(), &sketch.rhs.view())?;
        if solved.rank == 0 {
            tracing::warn!(mode, "sketched design matrix is zero, core set to zero");
        }
        if solved.solution.iter().any(|v| !v.is_finite()) {
            tracing::warn!(mode, "non-finite values in least-squares solution");
        }

        let core = core_fold_mode2(solved.solution.t(), r_left, r_right)?;
        self.tracker.update(mode, &core);
        self.decomp.cores[mode] = core;

        tracing::trace!(mode, rank = solved.rank, "core updated");
        Ok(())
    }

    /// Run one sweep over all modes
    ///
    /// Returns the relative error when the error check is active.
    pub fn sweep(&mut self) -> TrResult<Option<f64>> {
        for mode in 0..self.decomp.n_modes() {
            self.update_mode(mode)?;
        }
        self.iters += 1;

        if !self.error_check {
            if self.config.verbose {
                tracing::info!(iteration = self.iters, "sweep complete");
            }
            return Ok(None);
        }

        let error = match self.source.read_full() {
            Ok(full) => self.decomp.relative_error(&full)?,
            Err(e) if e.is_out_of_memory() => {
                tracing::warn!(error = %e, "full tensor does not fit in memory, disabling error check");
                self.error_check = false;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if self.config.verbose {
            tracing::info!(iteration = self.iters, error, "sweep complete");
        } else {
            tracing::debug!(iteration = self.iters, error, "sweep complete");
        }

        if let Some(prev) = self.prev_error {
            if (error - prev).abs() < self.config.tol {
                self.status = AlsStatus::Converged;
            }
        }
        self.prev_error = Some(error);
        self.error_history.push(error);

        Ok(Some(error))
    }

    /// Sweep until convergence or `max_iters`
    pub fn run(mut self) -> TrResult<TrAlsResult> {
        while self.status == AlsStatus::Running && self.iters < self.config.max_iters {
            self.sweep()?;
        }
        if self.status == AlsStatus::Running {
            self.status = AlsStatus::MaxItersReached;
        }

        if self.config.verbose {
            tracing::info!(iters = self.iters, status = ?self.status, "sampled TR-ALS finished");
        }

        Ok(TrAlsResult {
            decomp: self.decomp,
            iters: self.iters,
            status: self.status,
            error_history: self.error_history,
        })
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut thread_rng()),
    }
}

fn validate_inputs(
    shape: &[usize],
    ranks: &[usize],
    embedding_dims: &[usize],
    config: &TrAlsConfig,
) -> TrResult<()> {
    let n_modes = shape.len();
    if n_modes < 2 {
        return Err(TrError::ShapeMismatch(format!(
            "tensor ring needs at least two modes, got {}",
            n_modes
        )));
    }
    if let Some(m) = shape.iter().position(|&d| d == 0) {
        return Err(TrError::ShapeMismatch(format!("mode {} has size 0", m)));
    }
    if ranks.len() != n_modes {
        return Err(TrError::InvalidRanks(format!(
            "{} ranks for a {}-way tensor",
            ranks.len(),
            n_modes
        )));
    }
    if let Some(m) = ranks.iter().position(|&r| r == 0) {
        return Err(TrError::InvalidRanks(format!("rank {} is zero", m)));
    }
    if embedding_dims.len() != n_modes {
        return Err(TrError::InvalidEmbedding(format!(
            "{} embedding dimensions for a {}-way tensor",
            embedding_dims.len(),
            n_modes
        )));
    }
    if let Some(m) = embedding_dims.iter().position(|&j| j == 0) {
        return Err(TrError::InvalidEmbedding(format!("embedding dimension {} is zero", m)));
    }
    config.validate(n_modes)
}

/// Sampled TR-ALS from random initial cores
///
/// # Arguments
///
/// * `source` - In-memory [`tenring_core::DenseND`] or [`tenring_ooc::DiskSource`]
/// * `ranks` - Right rank of every core, `ranks.len() == N`
/// * `embedding_dims` - Sketch size per mode
/// * `config` - Run configuration
///
/// # Errors
///
/// Configuration errors are returned before any work starts; storage
/// failures abort the run.
pub fn tr_als_sampled<S>(
    source: &S,
    ranks: &[usize],
    embedding_dims: &[usize],
    config: &TrAlsConfig,
) -> TrResult<TrAlsResult>
where
    S: TensorSource + ?Sized,
{
    TrAlsSession::new(source, ranks, embedding_dims, config.clone())?.run()
}

/// Sampled TR-ALS from caller-supplied initial cores
pub fn tr_als_sampled_with_cores<S>(
    source: &S,
    init: TrDecomp,
    embedding_dims: &[usize],
    config: &TrAlsConfig,
) -> TrResult<TrAlsResult>
where
    S: TensorSource + ?Sized,
{
    TrAlsSession::with_cores(source, init, embedding_dims, config.clone())?.run()
}

//! Sampled sketch of the per-mode least-squares problem
//!
//! Updating core `n` means solving `G·Z = B`, where the rows of the full
//! design matrix `G` range over every multi-index of the other modes. The
//! sketch keeps only `J` sampled rows:
//!
//! 1. Row `j` of the sampled design matrix is the chain product of the other
//!    cores' lateral slices at the sampled indices, taken around the ring
//!    from mode `n+1` to mode `n-1`. The resulting `r_n × r_{n-1}` matrix `Q`
//!    is stored so that column `a·r_n + b` holds `Q[b, a]`.
//! 2. Row `j` of the right-hand side is the mode-`n` fiber of the data at the
//!    same sampled indices, fetched through [`TensorSource`].
//! 3. Both rows are scaled by `1 / sqrt(J · ∏_{m≠n} p_m(s_jm))`.
//!
//! The full design matrix is never formed.

use crate::error::{TrError, TrResult};
use crate::sampling::SamplingTracker;
use crate::tr::left_rank;
use scirs2_core::ndarray_ext::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use tenring_ooc::{validate_samples, TensorSource};

/// Persisted `(J_max, N)` buffer of sampled indices
///
/// Column `m` holds the draws for mode `m`. A sweep step for mode `n` reads
/// the first `J_n` rows and ignores column `n`.
#[derive(Debug, Clone)]
pub struct SampleSet {
    indices: Array2<usize>,
}

impl SampleSet {
    /// Zeroed buffer with `rows` rows and one column per mode
    pub fn new(rows: usize, n_modes: usize) -> Self {
        Self {
            indices: Array2::zeros((rows, n_modes)),
        }
    }

    /// Number of buffered rows
    pub fn n_rows(&self) -> usize {
        self.indices.nrows()
    }

    /// Number of modes
    pub fn n_modes(&self) -> usize {
        self.indices.ncols()
    }

    /// Overwrite the leading rows of column `mode` with `draws`
    pub fn refresh_mode(&mut self, mode: usize, draws: &[usize]) -> TrResult<()> {
        if mode >= self.n_modes() || draws.len() > self.n_rows() {
            return Err(TrError::ShapeMismatch(format!(
                "cannot write {} draws into column {} of a {:?} sample buffer",
                draws.len(),
                mode,
                self.indices.dim()
            )));
        }
        for (slot, &d) in self.indices.column_mut(mode).iter_mut().zip(draws) {
            *slot = d;
        }
        Ok(())
    }

    /// First `rows` sample rows
    pub fn rows(&self, rows: usize) -> ArrayView2<'_, usize> {
        self.indices.slice(s![..rows.min(self.n_rows()), ..])
    }

    /// Column of draws for `mode`
    pub fn column(&self, mode: usize) -> ArrayView1<'_, usize> {
        self.indices.column(mode)
    }
}

/// Rescaled sampled least-squares system for one mode
#[derive(Debug, Clone)]
pub struct Sketch {
    /// Sampled design matrix `(J, r_{n-1}·r_n)`
    pub design: Array2<f64>,
    /// Sampled right-hand side `(J, I_n)`
    pub rhs: Array2<f64>,
    /// Importance weight of every sampled row
    pub weights: Array1<f64>,
}

/// Importance weights `1 / sqrt(J · ∏_{m≠mode} p_m(s_jm))`
///
/// Computed as `exp(-(ln J + Σ ln p) / 2)`.
///
/// # Errors
///
/// [`TrError::DegenerateProbability`] when a drawn index has zero probability.
pub fn rescaling_weights(
    mode: usize,
    tracker: &SamplingTracker,
    samples: ArrayView2<'_, usize>,
) -> TrResult<Array1<f64>> {
    if samples.ncols() != tracker.n_modes() {
        return Err(TrError::ShapeMismatch(format!(
            "sample block has {} columns, tracker has {} modes",
            samples.ncols(),
            tracker.n_modes()
        )));
    }
    let ln_rows = (samples.nrows() as f64).ln();
    // log domain: the product over many modes underflows long before any
    // single probability is zero
    let mut log_probs = Array1::<f64>::zeros(samples.nrows());

    for m in (0..tracker.n_modes()).filter(|&m| m != mode) {
        let dist = tracker.distribution(m)?;
        for (acc, &idx) in log_probs.iter_mut().zip(samples.column(m)) {
            *acc += dist.prob(idx).ln();
        }
    }

    log_probs
        .iter()
        .zip(samples.outer_iter())
        .map(|(&log_p, row)| {
            let w = (-0.5 * (ln_rows + log_p)).exp();
            if log_p.is_finite() && w.is_finite() {
                Ok(w)
            } else {
                // blame the first factor that vanished
                let (m, idx) = (0..row.len())
                    .filter(|&m| m != mode)
                    .map(|m| (m, row[m]))
                    .find(|&(m, idx)| tracker.distribution(m).map_or(true, |d| d.prob(idx) <= 0.0))
                    .unwrap_or((mode, 0));
                Err(TrError::DegenerateProbability { mode: m, index: idx })
            }
        })
        .collect()
}

/// Ring order of the modes other than `mode`: `mode+1, …, N-1, 0, …, mode-1`
fn ring_order(mode: usize, n_modes: usize) -> Vec<usize> {
    (1..n_modes).map(|k| (mode + k) % n_modes).collect()
}

/// Write the design row for one sample into `out`
fn chain_row(
    mode: usize,
    cores: &[Array3<f64>],
    order: &[usize],
    sample: ArrayView1<'_, usize>,
    mut out: ArrayViewMut1<'_, f64>,
) {
    let r_right = cores[mode].shape()[2];
    let r_left = cores[mode].shape()[0];

    let first = order[0];
    let mut chain = cores[first].index_axis(Axis(1), sample[first]).to_owned();
    for &m in &order[1..] {
        chain = chain.dot(&cores[m].index_axis(Axis(1), sample[m]));
    }

    // chain is r_right × r_left
    for a in 0..r_left {
        for b in 0..r_right {
            out[a * r_right + b] = chain[[b, a]];
        }
    }
}

/// Unweighted sampled design matrix for `mode`
///
/// One independent chain product per sample row; with the `parallel`
/// feature the rows are computed on the rayon pool.
///
/// # Panics
///
/// Panics for fewer than two cores or a sample outside the core shapes;
/// [`build_sketch`] checks both before calling this.
pub fn sampled_design_matrix(
    mode: usize,
    cores: &[Array3<f64>],
    samples: ArrayView2<'_, usize>,
) -> Array2<f64> {
    let n_modes = cores.len();
    let order = ring_order(mode, n_modes);
    let ranks: Vec<usize> = cores.iter().map(|c| c.shape()[2]).collect();
    let width = left_rank(&ranks, mode) * ranks[mode];

    let mut design = Array2::<f64>::zeros((samples.nrows(), width));

    #[cfg(feature = "parallel")]
    {
        use scirs2_core::parallel_ops::*;

        design
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(j, row)| chain_row(mode, cores, &order, samples.row(j), row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (j, row) in design.axis_iter_mut(Axis(0)).enumerate() {
            chain_row(mode, cores, &order, samples.row(j), row);
        }
    }

    design
}

/// Build the rescaled sketch for `mode`
///
/// `samples` is `(J, N)`; column `mode` is ignored. Fibers are fetched with
/// `num_increments` storage reads along `mode`.
pub fn build_sketch<S>(
    mode: usize,
    cores: &[Array3<f64>],
    tracker: &SamplingTracker,
    samples: ArrayView2<'_, usize>,
    source: &S,
    num_increments: usize,
) -> TrResult<Sketch>
where
    S: TensorSource + ?Sized,
{
    let shape: Vec<usize> = cores.iter().map(|c| c.shape()[1]).collect();
    if shape.as_slice() != source.shape() {
        return Err(TrError::ShapeMismatch(format!(
            "cores describe {:?}, source has shape {:?}",
            shape,
            source.shape()
        )));
    }
    if shape.len() < 2 {
        return Err(TrError::ShapeMismatch("a ring needs at least two modes".to_string()));
    }
    validate_samples(&shape, mode, &samples)?;

    let weights = rescaling_weights(mode, tracker, samples)?;

    let mut design = sampled_design_matrix(mode, cores, samples);
    let mut rhs = source.fetch_mode_fibers(mode, samples, num_increments)?;

    for ((mut g_row, mut b_row), &w) in design
        .outer_iter_mut()
        .zip(rhs.outer_iter_mut())
        .zip(weights.iter())
    {
        g_row *= w;
        b_row *= w;
    }

    Ok(Sketch {
        design,
        rhs,
        weights,
    })
}

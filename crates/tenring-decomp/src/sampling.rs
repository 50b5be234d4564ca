//! Leverage-score sampling distributions
//!
//! For every mode the tracker keeps a probability vector over that mode's
//! indices, proportional to the squared Frobenius mass of the matching
//! lateral slice of the core:
//!
//! p_n(i) ∝ Σ_{a,b} G_n\[a, i, b\]²
//!
//! Draws are i.i.d. with replacement by inverse-CDF lookup, so indices with
//! zero probability are never returned. A core whose mass is zero or not
//! finite yields the uniform distribution and a warning.

use crate::error::{TrError, TrResult};
use scirs2_core::ndarray_ext::{Array1, Array3, Axis};
use scirs2_core::random::{rngs::StdRng, Rng};

/// Probability vector over one mode's indices
#[derive(Debug, Clone)]
pub struct ModeDistribution {
    probs: Array1<f64>,
    cdf: Vec<f64>,
    last_positive: usize,
    uniform_fallback: bool,
}

impl ModeDistribution {
    /// Distribution derived from the lateral-slice mass of `core`
    pub fn from_core(core: &Array3<f64>) -> Self {
        let masses: Vec<f64> = core
            .axis_iter(Axis(1))
            .map(|slice| slice.iter().map(|&v| v * v).sum())
            .collect();
        Self::from_masses(&masses)
    }

    /// Normalise non-negative masses into a distribution
    ///
    /// Falls back to uniform when the total is zero or not finite.
    pub fn from_masses(masses: &[f64]) -> Self {
        let size = masses.len();
        let total: f64 = masses.iter().sum();

        let (probs, uniform_fallback) = if total > 0.0 && total.is_finite() {
            (masses.iter().map(|&m| m / total).collect::<Array1<f64>>(), false)
        } else {
            (Array1::from_elem(size, 1.0 / size.max(1) as f64), true)
        };

        let mut running = 0.0;
        let cdf: Vec<f64> = probs
            .iter()
            .map(|&p| {
                running += p;
                running
            })
            .collect();
        let last_positive = probs.iter().rposition(|&p| p > 0.0).unwrap_or(0);

        Self {
            probs,
            cdf,
            last_positive,
            uniform_fallback,
        }
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// Whether the distribution covers no indices
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Probability vector
    pub fn probabilities(&self) -> &Array1<f64> {
        &self.probs
    }

    /// Probability of a single index (0 when out of range)
    pub fn prob(&self, index: usize) -> f64 {
        self.probs.get(index).copied().unwrap_or(0.0)
    }

    /// Whether the uniform fallback was used
    pub fn is_uniform_fallback(&self) -> bool {
        self.uniform_fallback
    }

    /// Draw one index
    pub fn draw(&self, rng: &mut StdRng) -> usize {
        let total = self.cdf.last().copied().unwrap_or(0.0);
        let u = rng.random::<f64>() * total;
        // first index whose cumulative mass exceeds u
        let idx = self.cdf.partition_point(|&c| c <= u);
        idx.min(self.last_positive)
    }
}

/// Per-mode sampling distributions kept in step with the cores
#[derive(Debug, Clone)]
pub struct SamplingTracker {
    distributions: Vec<Option<ModeDistribution>>,
}

impl SamplingTracker {
    /// Tracker for `n_modes` modes with no distribution computed yet
    pub fn new(n_modes: usize) -> Self {
        Self {
            distributions: vec![None; n_modes],
        }
    }

    /// Initial distributions for every mode except mode 0
    ///
    /// Mode 0 is the first one updated, and its own distribution is not
    /// needed to build that update.
    pub fn initialize(cores: &[Array3<f64>]) -> Self {
        let mut tracker = Self::new(cores.len());
        for (mode, core) in cores.iter().enumerate().skip(1) {
            tracker.update(mode, core);
        }
        tracker
    }

    /// Number of tracked modes
    pub fn n_modes(&self) -> usize {
        self.distributions.len()
    }

    /// Recompute the distribution for `mode` from its current core
    pub fn update(&mut self, mode: usize, core: &Array3<f64>) {
        let dist = ModeDistribution::from_core(core);
        if dist.is_uniform_fallback() {
            tracing::warn!(mode, "core has zero or non-finite mass, sampling uniformly");
        }
        self.distributions[mode] = Some(dist);
    }

    /// Current distribution for `mode`
    pub fn distribution(&self, mode: usize) -> TrResult<&ModeDistribution> {
        self.distributions
            .get(mode)
            .and_then(Option::as_ref)
            .ok_or(TrError::UninitializedDistribution(mode))
    }

    /// Draw `count` i.i.d. indices for `mode`
    pub fn sample(&self, mode: usize, count: usize, rng: &mut StdRng) -> TrResult<Vec<usize>> {
        let dist = self.distribution(mode)?;
        Ok((0..count).map(|_| dist.draw(rng)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::random::SeedableRng;

    #[test]
    fn test_probabilities_follow_slice_mass() {
        let mut core = Array3::<f64>::zeros((2, 3, 1));
        core[[0, 0, 0]] = 1.0;
        core[[1, 0, 0]] = 1.0;
        core[[0, 2, 0]] = 2.0;

        let dist = ModeDistribution::from_core(&core);
        let p = dist.probabilities();
        assert!((p[0] - 2.0 / 6.0).abs() < 1e-15);
        assert_eq!(p[1], 0.0);
        assert!((p[2] - 4.0 / 6.0).abs() < 1e-15);
        assert!(!dist.is_uniform_fallback());
    }

    #[test]
    fn test_zero_core_falls_back_to_uniform() {
        let dist = ModeDistribution::from_core(&Array3::zeros((2, 4, 2)));
        assert!(dist.is_uniform_fallback());
        for &p in dist.probabilities() {
            assert_eq!(p, 0.25);
        }
    }

    #[test]
    fn test_non_finite_core_falls_back_to_uniform() {
        let mut core = Array3::<f64>::ones((1, 3, 1));
        core[[0, 1, 0]] = f64::NAN;
        let dist = ModeDistribution::from_core(&core);
        assert!(dist.is_uniform_fallback());
        assert!(dist.probabilities().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_zero_probability_never_drawn() {
        let dist = ModeDistribution::from_masses(&[0.0, 3.0, 0.0, 1.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..2000 {
            let i = dist.draw(&mut rng);
            assert!(i == 1 || i == 3, "drew zero-probability index {}", i);
        }
    }

    #[test]
    fn test_draw_frequencies() {
        let dist = ModeDistribution::from_masses(&[1.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(3);
        let draws = 20_000;
        let ones = (0..draws).filter(|_| dist.draw(&mut rng) == 1).count();
        let freq = ones as f64 / draws as f64;
        assert!((freq - 0.75).abs() < 0.02, "frequency {}", freq);
    }

    #[test]
    fn test_mode_zero_uninitialised() {
        let cores = vec![Array3::ones((2, 3, 2)), Array3::ones((2, 4, 2))];
        let tracker = SamplingTracker::initialize(&cores);
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            tracker.sample(0, 5, &mut rng),
            Err(TrError::UninitializedDistribution(0))
        ));
        let draws = tracker.sample(1, 5, &mut rng).unwrap();
        assert_eq!(draws.len(), 5);
        assert!(draws.iter().all(|&i| i < 4));
    }

    #[test]
    fn test_update_replaces_distribution() {
        let mut tracker = SamplingTracker::new(1);
        tracker.update(0, &Array3::ones((1, 2, 1)));
        assert_eq!(tracker.distribution(0).unwrap().prob(0), 0.5);

        let mut core = Array3::<f64>::zeros((1, 2, 1));
        core[[0, 1, 0]] = 5.0;
        tracker.update(0, &core);
        assert_eq!(tracker.distribution(0).unwrap().prob(0), 0.0);
        assert_eq!(tracker.distribution(0).unwrap().prob(1), 1.0);
    }
}

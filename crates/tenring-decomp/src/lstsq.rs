//! Minimum-norm least squares for sketched systems
//!
//! Well-conditioned overdetermined sketches are solved column by column with
//! the QR-based [`scirs2_linalg::lstsq`]. Underdetermined (`J < R`) or
//! numerically rank-deficient sketches go through a truncated SVD
//! pseudo-inverse. Both paths finish with iterative refinement on the
//! residual `B − G·Z`, which recovers full precision when the factorization
//! is only accurate to a few digits.

use crate::error::TrResult;
use scirs2_core::ndarray_ext::{Array2, ArrayView2, Axis};
use scirs2_linalg::{lstsq, qr, svd};

/// Diagonal entries of `R` below this fraction of the largest one route the
/// solve to the pseudo-inverse.
const QR_CONDITION_CUTOFF: f64 = 1e-8;

const QR_REFINEMENT_STEPS: usize = 1;
const PINV_REFINEMENT_STEPS: usize = 3;

/// Solution of `min ‖G·Z − B‖` with smallest ‖Z‖
#[derive(Debug, Clone)]
pub struct LstsqSolution {
    /// Solution `(R, I)` for `G: (J, R)` and `B: (J, I)`
    pub solution: Array2<f64>,
    /// Numerical rank of `G`
    pub rank: usize,
}

/// Solve `G·Z = B` in the least-squares sense
///
/// Singular values below `max(J, R) · ε · σ_max` are discarded, so
/// rank-deficient and underdetermined (`J < R`) systems yield the
/// minimum-norm solution instead of an error. A zero `G` gives `Z = 0`.
///
/// # Errors
///
/// [`crate::TrError::Linalg`] if a factorization fails, for instance on
/// non-finite input.
pub fn min_norm_lstsq(g: &ArrayView2<'_, f64>, b: &ArrayView2<'_, f64>) -> TrResult<LstsqSolution> {
    let (rows, cols) = g.dim();
    if g.iter().all(|&v| v == 0.0) {
        return Ok(LstsqSolution {
            solution: Array2::zeros((cols, b.ncols())),
            rank: 0,
        });
    }

    // a failed or non-finite QR solve falls through to the pseudo-inverse
    if rows >= cols && well_conditioned_columns(g) {
        if let Ok(solution) = refined_qr_solve(g, b) {
            if solution.iter().all(|v| v.is_finite()) {
                return Ok(LstsqSolution { solution, rank: cols });
            }
        }
    }

    let pinv = PseudoInverse::new(g)?;
    let mut solution = pinv.apply(b);
    for _ in 0..PINV_REFINEMENT_STEPS {
        let residual = b.to_owned() - g.dot(&solution);
        solution += &pinv.apply(&residual.view());
    }

    Ok(LstsqSolution {
        solution,
        rank: pinv.rank,
    })
}

/// `true` when no diagonal entry of the QR factor `R` is negligible
fn well_conditioned_columns(g: &ArrayView2<'_, f64>) -> bool {
    let Ok((_, r)) = qr(g, None) else {
        return false;
    };
    let diag = r.diag().mapv(f64::abs);
    let largest = diag.iter().copied().fold(0.0, f64::max);
    diag.len() == g.ncols() && diag.iter().all(|&d| d > QR_CONDITION_CUTOFF * largest)
}

fn refined_qr_solve(g: &ArrayView2<'_, f64>, b: &ArrayView2<'_, f64>) -> TrResult<Array2<f64>> {
    let mut solution = solve_columns(g, b)?;
    for _ in 0..QR_REFINEMENT_STEPS {
        let residual = b.to_owned() - g.dot(&solution);
        solution += &solve_columns(g, &residual.view())?;
    }
    Ok(solution)
}

fn solve_columns(g: &ArrayView2<'_, f64>, b: &ArrayView2<'_, f64>) -> TrResult<Array2<f64>> {
    let mut solution = Array2::<f64>::zeros((g.ncols(), b.ncols()));
    for (rhs, mut out) in b.axis_iter(Axis(1)).zip(solution.axis_iter_mut(Axis(1))) {
        let column = lstsq(g, &rhs, None)?;
        out.assign(&column.x);
    }
    Ok(solution)
}

/// Truncated `V·Σ⁻¹·Uᵀ`, kept factored
struct PseudoInverse {
    /// `V_k·Σ_k⁻¹`, `(R, k)`
    v_scaled: Array2<f64>,
    /// `U_kᵀ`, `(k, J)`
    ut: Array2<f64>,
    rank: usize,
}

impl PseudoInverse {
    fn new(g: &ArrayView2<'_, f64>) -> TrResult<Self> {
        let (rows, cols) = g.dim();
        let (u, s, vt) = svd(g, false, None)?;

        let sigma_max = s.iter().copied().fold(0.0, f64::max);
        let cutoff = rows.max(cols) as f64 * f64::EPSILON * sigma_max;
        let kept: Vec<usize> = (0..s.len()).filter(|&k| s[k] > cutoff && s[k] > 0.0).collect();

        let mut v_scaled = Array2::<f64>::zeros((cols, kept.len()));
        let mut ut = Array2::<f64>::zeros((kept.len(), rows));
        for (slot, &k) in kept.iter().enumerate() {
            v_scaled.column_mut(slot).assign(&vt.row(k).mapv(|v| v / s[k]));
            ut.row_mut(slot).assign(&u.column(k));
        }

        Ok(Self {
            v_scaled,
            ut,
            rank: kept.len(),
        })
    }

    fn apply(&self, rhs: &ArrayView2<'_, f64>) -> Array2<f64> {
        self.v_scaled.dot(&self.ut.dot(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SamplingTracker;
    use crate::sketch::build_sketch;
    use crate::tr::{core_unfold_mode2, TrDecomp};
    use scirs2_core::ndarray_ext::{array, Array1};
    use scirs2_core::random::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_overdetermined_exact() {
        let g = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let z_true = array![[1.0, -1.0], [3.0, 0.5]];
        let b = g.dot(&z_true);

        let sol = min_norm_lstsq(&g.view(), &b.view()).unwrap();
        assert_eq!(sol.rank, 2);
        for (x, y) in sol.solution.iter().zip(z_true.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_overdetermined_least_squares_residual() {
        // fit of a line through (1,6), (2,9), (3,12) plus an inconsistent point
        let g = array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0]];
        let b = array![[6.0], [9.0], [12.0], [14.0]];

        let sol = min_norm_lstsq(&g.view(), &b.view()).unwrap();
        // normal equations hold at the minimiser
        let grad = g.t().dot(&(g.dot(&sol.solution) - &b));
        assert!(grad.iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_underdetermined_minimum_norm() {
        // x + y = 2 has minimum-norm solution (1, 1)
        let g = array![[1.0, 1.0]];
        let b = array![[2.0]];

        let sol = min_norm_lstsq(&g.view(), &b.view()).unwrap();
        assert_eq!(sol.rank, 1);
        assert!((sol.solution[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((sol.solution[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rank_deficient_columns() {
        // duplicated column: minimum-norm solution splits the weight
        let g = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let b = array![[2.0], [4.0], [6.0]];

        let sol = min_norm_lstsq(&g.view(), &b.view()).unwrap();
        assert_eq!(sol.rank, 1);
        assert!((sol.solution[[0, 0]] - 1.0).abs() < 1e-10);
        assert!((sol.solution[[1, 0]] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_design_gives_zero() {
        let g = Array2::<f64>::zeros((4, 3));
        let b = Array2::<f64>::ones((4, 2));

        let sol = min_norm_lstsq(&g.view(), &b.view()).unwrap();
        assert_eq!(sol.rank, 0);
        assert!(sol.solution.iter().all(|&v| v == 0.0));
        assert_eq!(sol.solution.shape(), &[3, 2]);
    }

    #[test]
    fn test_sketch_of_exact_cores_recovers_them() {
        let shape = [6, 7, 8];
        let mut rng = StdRng::seed_from_u64(90);
        let truth = TrDecomp::random(&shape, &[2, 2, 2], 1.0, &mut rng).unwrap();
        let tensor = truth.reconstruct().unwrap();
        let tracker = SamplingTracker::initialize(&truth.cores);

        for trial in 0..5u64 {
            let mut rng = StdRng::seed_from_u64(100 + trial);
            let mut samples = Array2::<usize>::zeros((40, 3));
            for m in 1..3 {
                let draws = tracker.sample(m, 40, &mut rng).unwrap();
                samples.column_mut(m).assign(&Array1::from(draws));
            }

            let sketch =
                build_sketch(0, &truth.cores, &tracker, samples.view(), &tensor, 0).unwrap();
            let sol = min_norm_lstsq(&sketch.design.view(), &sketch.rhs.view()).unwrap();

            let expected = core_unfold_mode2(&truth.cores[0]);
            let scale = expected.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            for (x, y) in sol.solution.t().iter().zip(expected.iter()) {
                assert!(
                    (x - y).abs() < 1e-12 * scale.max(1.0),
                    "trial {}: {} vs {}",
                    trial,
                    x,
                    y
                );
            }
        }
    }
}

//! Weighted least squares solver.
//!
//! Every parameter curve is a small regression of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! with `x_i` a polynomial design row and `w_i = 1/σ_i²`.
//!
//! Implementation choices:
//! - Rows are scaled by `sqrt(w_i)` and the result is an ordinary least squares problem.
//! - SVD handles both the tall case (more grid points than coefficients) and the
//!   exactly determined case. Nalgebra's `QR::solve` is intended for square
//!   systems and panics for non-square matrices.
//! - Column counts are tiny (degree + 1), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Singular values below `tol * σ_max` are treated as zero, so the result does
/// not depend on the overall scale of `x`.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);
    let largest = svd.singular_values.max();
    if !(largest.is_finite() && largest > 0.0) {
        return None;
    }

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol * largest) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Build the `sqrt(w)`-scaled system for `rows`/`y`/`w` and solve it.
///
/// Rows with zero weight contribute nothing and are dropped before solving.
/// Weights are rescaled to a maximum of 1; a uniform factor on `w` leaves the
/// solution unchanged.
pub fn solve_weighted(rows: &[Vec<f64>], y: &[f64], w: &[f64]) -> Option<DVector<f64>> {
    let p = rows.first()?.len();
    let kept: Vec<usize> = (0..rows.len()).filter(|&i| w[i] > 0.0).collect();
    if kept.is_empty() {
        return None;
    }
    let w_max = kept.iter().map(|&i| w[i]).fold(0.0_f64, f64::max);
    if !w_max.is_finite() {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(kept.len(), p);
    let mut yw = DVector::<f64>::zeros(kept.len());
    for (r, &i) in kept.iter().enumerate() {
        let sw = (w[i] / w_max).sqrt();
        for j in 0..p {
            xw[(r, j)] = rows[i][j] * sw;
        }
        yw[r] = y[i] * sw;
    }
    solve_least_squares(&xw, &yw)
}

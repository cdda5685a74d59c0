//! Weighted polynomial regression of one parameter across the mass grid.
//!
//! Given:
//! - grid masses `m_i`
//! - fitted parameter values `y_i`
//! - fit uncertainties `σ_i`
//!
//! we solve
//!
//! ```text
//! minimize Σ (y_i - p(m_i))² / σ_i²
//! ```
//!
//! for a polynomial `p` of fixed degree, expressed in the normalized variable of
//! `math::basis::MassScaling`.

use serde::{Deserialize, Serialize};

use crate::domain::{GridSample, UncertaintyPolicy};
use crate::error::InterpError;
use crate::fit::mass_grid::validate_grid;
use crate::math::{MassScaling, eval_poly, fill_poly_row, solve_weighted};

/// A fitted polynomial plus goodness-of-fit diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyFit {
    /// Coefficients of `t^0, t^1, ...` with `t = (m - shift) / scale`.
    pub coefficients: Vec<f64>,
    pub shift: f64,
    pub scale: f64,
    /// Weighted sum of squared residuals.
    pub chi2: f64,
    /// Points with non-zero weight minus the number of coefficients.
    pub ndf: usize,
}

impl PolyFit {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    fn scaling(&self) -> MassScaling {
        MassScaling { shift: self.shift, scale: self.scale }
    }

    /// Evaluate the polynomial at mass `m`.
    pub fn eval(&self, m: f64) -> f64 {
        eval_poly(&self.coefficients, self.scaling().apply(m))
    }
}

/// Inverse-variance weights for `samples` under `policy`.
///
/// Fails with `DegenerateUncertainty` when no sample ends up with a finite,
/// positive weight.
pub fn resolve_weights(samples: &[GridSample], policy: UncertaintyPolicy) -> Result<Vec<f64>, InterpError> {
    let weights: Vec<f64> = samples
        .iter()
        .map(|s| {
            let usable = s.error.filter(|e| e.is_finite() && *e > 0.0);
            let w = match policy {
                UncertaintyPolicy::Unweighted => 1.0,
                UncertaintyPolicy::Skip => usable.map_or(0.0, |e| 1.0 / (e * e)),
                UncertaintyPolicy::Floor { min_sigma } => {
                    let sigma = usable.map_or(min_sigma, |e| e.max(min_sigma));
                    1.0 / (sigma * sigma)
                }
            };
            if w.is_finite() { w } else { 0.0 }
        })
        .collect();

    if weights.iter().all(|&w| w <= 0.0) {
        return Err(InterpError::DegenerateUncertainty);
    }
    Ok(weights)
}

/// Fit a polynomial of `degree` to `samples`.
///
/// Underdetermined inputs fail with `InsufficientGridPoints`; the degree is
/// never lowered silently.
pub fn fit_polynomial(
    samples: &[GridSample],
    degree: usize,
    policy: UncertaintyPolicy,
) -> Result<PolyFit, InterpError> {
    let needed = degree + 1;
    if samples.len() < needed {
        return Err(InterpError::InsufficientGridPoints {
            degree,
            needed,
            found: samples.len(),
        });
    }

    let grid = validate_grid(samples)?;
    let weights = resolve_weights(&grid, policy)?;

    let weighted = weights.iter().filter(|&&w| w > 0.0).count();
    if weighted < needed {
        return Err(InterpError::InsufficientGridPoints {
            degree,
            needed,
            found: weighted,
        });
    }

    let (first, last) = (grid[0].mass, grid[grid.len() - 1].mass);
    let scaling = MassScaling::from_range(first, last);

    let rows: Vec<Vec<f64>> = grid
        .iter()
        .map(|s| {
            let mut row = vec![0.0; needed];
            fill_poly_row(scaling.apply(s.mass), degree, &mut row);
            row
        })
        .collect();
    let y: Vec<f64> = grid.iter().map(|s| s.value).collect();

    let beta = solve_weighted(&rows, &y, &weights).ok_or(InterpError::SolveFailed { degree })?;
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let mut chi2 = 0.0;
    for (s, &w) in grid.iter().zip(&weights) {
        let r = s.value - eval_poly(&coefficients, scaling.apply(s.mass));
        chi2 += w * r * r;
    }
    if !chi2.is_finite() {
        return Err(InterpError::SolveFailed { degree });
    }

    Ok(PolyFit {
        coefficients,
        shift: scaling.shift,
        scale: scaling.scale,
        chi2,
        ndf: weighted - needed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn samples(points: &[(f64, f64, Option<f64>)]) -> Vec<GridSample> {
        points
            .iter()
            .map(|&(mass, value, error)| GridSample { mass, value, error })
            .collect()
    }

    const FLOOR: UncertaintyPolicy = UncertaintyPolicy::Floor { min_sigma: 1e-6 };

    #[test]
    fn exact_line_through_three_points() {
        let grid = samples(&[(1.0, 10.0, Some(1.0)), (2.0, 20.0, Some(1.0)), (3.0, 30.0, Some(1.0))]);
        let fit = fit_polynomial(&grid, 1, FLOOR).unwrap();
        assert_abs_diff_eq!(fit.eval(1.5), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.chi2, 0.0, epsilon = 1e-12);
        assert_eq!(fit.ndf, 1);
        assert_eq!(fit.degree(), 1);
    }

    #[test]
    fn two_points_degree_one_is_the_unique_line() {
        let grid = samples(&[(4.0, 0.7, Some(0.1)), (21.0, 2.4, Some(0.3))]);
        let fit = fit_polynomial(&grid, 1, FLOOR).unwrap();
        assert_abs_diff_eq!(fit.eval(4.0), 0.7, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.eval(21.0), 2.4, epsilon = 1e-9);
        assert_eq!(fit.ndf, 0);
    }

    #[test]
    fn quadratic_is_recovered_on_heavy_mass_scale() {
        // Raw powers of ~750 GeV would be badly conditioned without normalization.
        let f = |m: f64| 3.0 + 0.02 * m + 1e-5 * m * m;
        let grid: Vec<GridSample> = [125.0, 300.0, 450.0, 600.0, 750.0]
            .iter()
            .map(|&m| GridSample { mass: m, value: f(m), error: Some(0.5) })
            .collect();
        let fit = fit_polynomial(&grid, 2, FLOOR).unwrap();
        for m in [150.0, 500.0, 700.0] {
            assert_abs_diff_eq!(fit.eval(m), f(m), epsilon = 1e-8);
        }
    }

    #[test]
    fn weighting_pulls_line_towards_precise_points() {
        let grid = samples(&[(1.0, 10.0, Some(1.0)), (2.0, 10.0, Some(1.0)), (3.0, 100.0, Some(100.0))]);
        let weighted = fit_polynomial(&grid, 1, FLOOR).unwrap();
        let unweighted = fit_polynomial(&grid, 1, UncertaintyPolicy::Unweighted).unwrap();

        let dist = |fit: &PolyFit| (fit.eval(1.0) - 10.0).abs() + (fit.eval(2.0) - 10.0).abs();
        assert!(dist(&weighted) < dist(&unweighted));
        assert!(dist(&weighted) < 0.1, "weighted fit should nearly pass through the precise points");
    }

    #[test]
    fn large_uniform_uncertainties_match_the_unweighted_fit() {
        let grid = |sigma: f64| samples(&[(1.0, 10.0, Some(sigma)), (2.0, 20.0, Some(sigma)), (3.0, 30.0, Some(sigma))]);
        let unweighted = fit_polynomial(&grid(1.0), 1, UncertaintyPolicy::Unweighted).unwrap();
        for sigma in [1e-7, 1.0, 1e13] {
            let fit = fit_polynomial(&grid(sigma), 1, FLOOR).unwrap();
            assert_abs_diff_eq!(fit.eval(1.5), 15.0, epsilon = 1e-9);
            for (a, b) in fit.coefficients.iter().zip(&unweighted.coefficients) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn degree_two_with_two_points_is_insufficient() {
        let grid = samples(&[(1.0, 1.0, Some(1.0)), (2.0, 2.0, Some(1.0))]);
        let err = fit_polynomial(&grid, 2, FLOOR).unwrap_err();
        assert_eq!(err, InterpError::InsufficientGridPoints { degree: 2, needed: 3, found: 2 });
    }

    #[test]
    fn skipped_points_count_against_degree() {
        let grid = samples(&[(1.0, 1.0, Some(1.0)), (2.0, 2.0, None), (3.0, 3.0, Some(0.0))]);
        let err = fit_polynomial(&grid, 1, UncertaintyPolicy::Skip).unwrap_err();
        assert_eq!(err, InterpError::InsufficientGridPoints { degree: 1, needed: 2, found: 1 });
    }

    #[test]
    fn all_unusable_uncertainties_are_degenerate() {
        let grid = samples(&[(1.0, 1.0, None), (2.0, 2.0, Some(f64::NAN))]);
        let err = fit_polynomial(&grid, 1, UncertaintyPolicy::Skip).unwrap_err();
        assert_eq!(err, InterpError::DegenerateUncertainty);
    }

    #[test]
    fn floor_policy_replaces_missing_uncertainty() {
        let grid = samples(&[(1.0, 1.0, None), (2.0, 2.0, Some(0.0)), (3.0, 5.0, Some(1e-12))]);
        let w = resolve_weights(&grid, UncertaintyPolicy::Floor { min_sigma: 0.5 }).unwrap();
        assert_eq!(w, vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn duplicate_masses_are_rejected() {
        let grid = samples(&[(1.0, 1.0, Some(1.0)), (1.0, 2.0, Some(1.0)), (2.0, 3.0, Some(1.0))]);
        assert!(matches!(fit_polynomial(&grid, 1, FLOOR), Err(InterpError::NonMonotonicGrid(_))));
    }
}

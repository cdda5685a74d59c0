//! Reporting utilities: grid residuals, pulls and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{GridPoint, ParamKey};
use crate::error::AppError;
use crate::fit::Interpolator;
use crate::models::CompositeTemplate;

/// Residual of one grid value against its interpolated curve.
#[derive(Debug, Clone, PartialEq)]
pub struct GridResidual {
    pub param: ParamKey,
    pub mass: f64,
    pub value: f64,
    pub fitted: f64,
    pub residual: f64,
    /// `residual / error`, when the grid value carries a usable uncertainty.
    pub pull: Option<f64>,
}

/// Compare every grid value with the template's curve at the same mass.
///
/// In direct mode every residual is exactly zero.
pub fn compute_grid_residuals(template: &CompositeTemplate, points: &[GridPoint]) -> Result<Vec<GridResidual>, AppError> {
    let mut out = Vec::new();
    for (key, interp) in &template.params {
        for p in points {
            let Some(est) = p.params.get(key) else { continue };
            out.push(residual(*key, interp, p.mass, est.value, est.error)?);
        }
    }
    Ok(out)
}

/// Residuals of one parameter against the grid stored in the template itself.
pub fn stored_grid_residuals(template: &CompositeTemplate, key: ParamKey) -> Result<Vec<GridResidual>, AppError> {
    let interp = template
        .params
        .get(&key)
        .ok_or_else(|| AppError::new(2, format!("Template {} has no curve for {key}", template.name)))?;
    interp
        .grid()
        .iter()
        .map(|s| residual(key, interp, s.mass, s.value, s.error))
        .collect()
}

fn residual(
    param: ParamKey,
    interp: &Interpolator,
    mass: f64,
    value: f64,
    error: Option<f64>,
) -> Result<GridResidual, AppError> {
    let fitted = interp.value_at(mass)?;
    if !fitted.is_finite() {
        return Err(AppError::new(4, "Non-finite curve value during residual computation."));
    }
    let residual = value - fitted;
    let pull = error.filter(|e| e.is_finite() && *e > 0.0).map(|e| residual / e);
    Ok(GridResidual {
        param,
        mass,
        value,
        fitted,
        residual,
        pull,
    })
}

/// Largest absolute pulls, worst first.
pub fn worst_pulls(residuals: &[GridResidual], top_n: usize) -> Vec<GridResidual> {
    let mut with_pull: Vec<GridResidual> = residuals.iter().filter(|r| r.pull.is_some()).cloned().collect();
    with_pull.sort_by(|a, b| {
        let pa = a.pull.map_or(0.0, f64::abs);
        let pb = b.pull.map_or(0.0, f64::abs);
        pb.total_cmp(&pa)
    });
    with_pull.truncate(top_n);
    with_pull
}

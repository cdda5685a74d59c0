//! Grid-to-continuum interpolation of a single parameter.
//!
//! The strategy is chosen once, when the interpolator is built:
//!
//! - `Direct`: the grid itself. Only grid masses can be queried.
//! - `Fitted`: a weighted polynomial regression, usable at any mass. The grid
//!   it was fitted to is kept for residuals and plots.
//!
//! Consumers never re-derive the mode; they call `value_at` / `curve`.

use serde::{Deserialize, Serialize};

use crate::domain::{GridSample, InterpMode, UncertaintyPolicy};
use crate::error::InterpError;
use crate::fit::mass_grid::{MassPartition, validate_grid};
use crate::fit::polyfit::{PolyFit, fit_polynomial};

/// Relative tolerance for matching a query mass to a grid mass.
const MASS_MATCH_REL_TOL: f64 = 1e-9;

/// Continuous representation of one parameter as a function of mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Interpolator {
    Direct { grid: Vec<GridSample> },
    Fitted {
        degree: usize,
        fit: PolyFit,
        #[serde(default)]
        grid: Vec<GridSample>,
    },
}

/// Ordered `(mass, value)` samples of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCurve {
    pub masses: Vec<f64>,
    pub values: Vec<f64>,
}

impl ParameterCurve {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.masses.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

impl Interpolator {
    /// Direct carry-through of the grid (N >= 1).
    pub fn direct(samples: &[GridSample]) -> Result<Self, InterpError> {
        if samples.is_empty() {
            return Err(InterpError::InsufficientGridPoints {
                degree: 0,
                needed: 1,
                found: 0,
            });
        }
        let grid = validate_grid(samples)?;
        Ok(Interpolator::Direct { grid })
    }

    /// Weighted polynomial fit of the given degree (N >= degree + 1).
    pub fn fitted(samples: &[GridSample], degree: usize, policy: UncertaintyPolicy) -> Result<Self, InterpError> {
        let fit = fit_polynomial(samples, degree, policy)?;
        let grid = validate_grid(samples)?;
        Ok(Interpolator::Fitted { degree, fit, grid })
    }

    /// Build with the run's mode. `degree` is ignored in direct mode.
    pub fn build(
        mode: InterpMode,
        samples: &[GridSample],
        degree: usize,
        policy: UncertaintyPolicy,
    ) -> Result<Self, InterpError> {
        match mode {
            InterpMode::Direct => Self::direct(samples),
            InterpMode::Fit => Self::fitted(samples, degree, policy),
        }
    }

    pub fn mode(&self) -> InterpMode {
        match self {
            Interpolator::Direct { .. } => InterpMode::Direct,
            Interpolator::Fitted { .. } => InterpMode::Fit,
        }
    }

    /// Parameter value at mass `m`.
    ///
    /// Direct mode only answers at grid masses; fitted mode evaluates the
    /// polynomial anywhere (including outside the grid range).
    pub fn value_at(&self, m: f64) -> Result<f64, InterpError> {
        match self {
            Interpolator::Direct { grid } => {
                let tol = MASS_MATCH_REL_TOL * m.abs().max(1.0);
                grid.iter()
                    .find(|s| (s.mass - m).abs() <= tol)
                    .map(|s| s.value)
                    .ok_or(InterpError::UnknownQueryMass { mass: m })
            }
            Interpolator::Fitted { fit, .. } => {
                let v = fit.eval(m);
                if v.is_finite() { Ok(v) } else { Err(InterpError::NonFiniteValue { mass: m }) }
            }
        }
    }

    /// Piecewise-linear reading of a direct grid: exact at grid masses, linear
    /// between neighbours, `UnknownQueryMass` outside `[m_1, m_N]`. Fitted
    /// interpolators evaluate their polynomial.
    pub fn linear_at(&self, m: f64) -> Result<f64, InterpError> {
        let Interpolator::Direct { grid } = self else {
            return self.value_at(m);
        };
        if let Ok(v) = self.value_at(m) {
            return Ok(v);
        }
        match grid.iter().position(|s| s.mass > m) {
            Some(i) if i > 0 => {
                let (lo, hi) = (&grid[i - 1], &grid[i]);
                let f = (m - lo.mass) / (hi.mass - lo.mass);
                Ok(lo.value + f * (hi.value - lo.value))
            }
            _ => Err(InterpError::UnknownQueryMass { mass: m }),
        }
    }

    /// `linear_at` sampled on `partition`.
    pub fn linear_curve(&self, partition: &MassPartition) -> ParameterCurve {
        let (masses, values) = partition
            .masses()
            .into_iter()
            .filter_map(|m| self.linear_at(m).ok().map(|v| (m, v)))
            .unzip();
        ParameterCurve { masses, values }
    }

    /// Sampled curve: the grid in direct mode, the polynomial on `partition` otherwise.
    pub fn curve(&self, partition: &MassPartition) -> ParameterCurve {
        match self {
            Interpolator::Direct { grid } => ParameterCurve {
                masses: grid.iter().map(|s| s.mass).collect(),
                values: grid.iter().map(|s| s.value).collect(),
            },
            Interpolator::Fitted { fit, .. } => {
                let masses = partition.masses();
                let values = masses.iter().map(|&m| fit.eval(m)).collect();
                ParameterCurve { masses, values }
            }
        }
    }

    /// Grid samples this interpolator was built from, ascending in mass.
    pub fn grid(&self) -> &[GridSample] {
        match self {
            Interpolator::Direct { grid } | Interpolator::Fitted { grid, .. } => grid,
        }
    }

    pub fn poly_fit(&self) -> Option<&PolyFit> {
        match self {
            Interpolator::Direct { .. } => None,
            Interpolator::Fitted { fit, .. } => Some(fit),
        }
    }
}

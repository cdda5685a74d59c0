//! Mass grids: validation of the discrete scan and the dense uniform partition.
//!
//! Every curve of a template is sampled on the same partition so that the
//! consumer evaluates all parameters at identical masses.

use serde::{Deserialize, Serialize};

use crate::domain::GridSample;
use crate::error::{AppError, InterpError};

/// Dense, equally spaced partition of `[min, max]` (endpoints included).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassPartition {
    pub min: f64,
    pub max: f64,
    pub intervals: usize,
}

impl MassPartition {
    /// Partition `[min, max]` into `intervals` equal steps.
    pub fn uniform(min: f64, max: f64, intervals: usize) -> Result<Self, AppError> {
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(AppError::new(
                2,
                format!("Invalid mass range: min={min}, max={max} (must be finite and max>min)."),
            ));
        }
        if intervals == 0 {
            return Err(AppError::new(2, "Partition needs at least one interval."));
        }
        Ok(Self { min, max, intervals })
    }

    /// Width of one interval.
    pub fn step(&self) -> f64 {
        (self.max - self.min) / self.intervals as f64
    }

    /// Sample masses. The last one is exactly `max`.
    pub fn masses(&self) -> Vec<f64> {
        let step = self.step();
        (0..=self.intervals)
            .map(|i| if i == self.intervals { self.max } else { self.min + step * i as f64 })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.intervals + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Sort samples by mass and check they form a usable grid.
///
/// Rejects non-finite masses or values and repeated masses. Uncertainties are
/// not checked here; see `polyfit::resolve_weights`.
pub fn validate_grid(samples: &[GridSample]) -> Result<Vec<GridSample>, InterpError> {
    for s in samples {
        if !s.mass.is_finite() || !s.value.is_finite() {
            return Err(InterpError::NonFiniteValue { mass: s.mass });
        }
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.mass.total_cmp(&b.mass));

    if let Some(w) = sorted.windows(2).find(|w| w[1].mass <= w[0].mass) {
        return Err(InterpError::NonMonotonicGrid(format!("mass {} appears more than once", w[0].mass)));
    }
    Ok(sorted)
}

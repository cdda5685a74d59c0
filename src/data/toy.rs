//! Toy fit-result grids for dry runs.
//!
//! Every parameter follows a smooth low-order trend in the light mass `a`
//! (scaled with the heavy mass `h` where it makes sense), with a reproducible
//! Gaussian jitter. Uncertainties equal the jitter scale, so the weighted fit
//! sees consistent pulls.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{
    AnalysisConfig, Axis, GridRecord, RecordTarget, ShapeParam, format_mass_label,
};
use crate::error::AppError;

/// Largest relative jitter accepted; keeps positive parameters positive.
const MAX_NOISE: f64 = 0.2;
/// Jitter draws are clipped to this many standard deviations.
const CLIP_Z: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct ToyOptions {
    pub seed: u64,
    /// Relative jitter applied to every value.
    pub noise: f64,
}

impl Default for ToyOptions {
    fn default() -> Self {
        Self { seed: 42, noise: 0.01 }
    }
}

/// Generate one record per scan key, allowed light mass and declared parameter.
pub fn generate_toy_grid(config: &AnalysisConfig, opts: ToyOptions) -> Result<Vec<GridRecord>, AppError> {
    if !(opts.noise.is_finite() && (0.0..=MAX_NOISE).contains(&opts.noise)) {
        return Err(AppError::new(2, format!("Toy noise must be in [0, {MAX_NOISE}], got {}.", opts.noise)));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let keys = config.scan_keys();
    let mut records = Vec::new();
    for key in &keys {
        let bias = shift_bias(&key.shift);
        for a in config.a_masses_for(key.h)? {
            let targets = config
                .param_keys()
                .into_iter()
                .map(RecordTarget::Param)
                .chain(std::iter::once(RecordTarget::Integral));
            for target in targets {
                let truth = trend(target, key.h as f64, a) * (1.0 + bias);
                let z: f64 = normal.sample(&mut rng);
                let sigma = opts.noise * truth.abs();
                records.push(GridRecord {
                    key: key.clone(),
                    a,
                    target,
                    value: truth + sigma * z.clamp(-CLIP_Z, CLIP_Z),
                    error: (sigma > 0.0).then_some(sigma),
                });
            }
        }
    }
    Ok(records)
}

/// Systematic variations move everything by a small, fixed fraction.
fn shift_bias(shift: &str) -> f64 {
    if shift.ends_with("Up") {
        0.02
    } else if shift.ends_with("Down") {
        -0.02
    } else {
        0.0
    }
}

/// Noise-free value of a record target at `(h, a)`.
fn trend(target: RecordTarget, h: f64, a: f64) -> f64 {
    let key = match target {
        RecordTarget::Integral => return 40.0 + 6.0 * a - 0.12 * a * a,
        RecordTarget::Param(k) => k,
    };
    use ShapeParam::*;
    match (key.axis, key.param) {
        (Axis::X, Mean) => a,
        (Axis::X, Width | Width1 | Width2) => 0.002 * a + 0.0005 * a * a,
        (Axis::X, Sigma | Sigma1 | Sigma2) => 0.02 + 0.012 * a + 0.0002 * a * a,
        (Axis::Y, Mean) => 0.85 * h + 0.4 * a,
        (Axis::Y, Width | Width1 | Width2) => 0.01 * h + 0.05 * a,
        (Axis::Y, Sigma | Sigma1) => 0.08 * h + 0.3 * a,
        (Axis::Y, Sigma2) => 0.12 * h + 0.2 * a + 0.01 * a * a,
        (_, A | A1 | A2) => 1.2 + 0.02 * a,
        (_, N | N1 | N2) => 3.0 + 0.1 * a - 0.002 * a * a,
    }
}

/// Write records in the grid CSV layout read by `io::ingest`.
pub fn write_grid_csv(path: &Path, records: &[GridRecord]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create grid CSV '{}': {e}", path.display())))?;
    write_grid(&mut file, records)
}

pub fn write_grid<W: Write>(out: &mut W, records: &[GridRecord]) -> Result<(), AppError> {
    writeln!(out, "region,shift,h,a,param,value,error")
        .map_err(|e| AppError::new(2, format!("Failed to write grid CSV header: {e}")))?;
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{:.10},{}",
            r.key.region,
            r.key.shift,
            r.key.h,
            format_mass_label(r.a),
            r.target,
            r.value,
            r.error.map(|e| format!("{e:.10}")).unwrap_or_default(),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write grid CSV row: {e}")))?;
    }
    Ok(())
}

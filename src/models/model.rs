//! Shape evaluation for every `ShapeFamily`.
//!
//! The interpolator only ever deals with numbers; this module turns a full set
//! of parameter values back into a line shape so templates can be sanity
//! checked (and plotted) at any mass.
//!
//! All shapes are evaluated unnormalized; `ShapeParams::density` normalizes on
//! the observable range numerically.

use serde::{Deserialize, Serialize};

use crate::domain::{ShapeFamily, ShapeParam};
use crate::error::AppError;
use crate::math::simpson;

/// Simpson intervals used when normalizing on an observable range.
const NORM_INTERVALS: usize = 2000;

/// Values for one family's declared parameters (same order as `family.params()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    pub family: ShapeFamily,
    pub values: Vec<f64>,
}

impl ShapeParams {
    /// Build from values in declared order.
    pub fn new(family: ShapeFamily, values: Vec<f64>) -> Result<Self, AppError> {
        let expected = family.params().len();
        if values.len() != expected {
            return Err(AppError::new(
                4,
                format!("{} expects {expected} parameters, got {}", family.display_name(), values.len()),
            ));
        }
        let out = Self { family, values };
        out.validate()?;
        Ok(out)
    }

    /// Value of a declared parameter.
    pub fn get(&self, param: ShapeParam) -> Option<f64> {
        self.family
            .params()
            .iter()
            .position(|&p| p == param)
            .map(|i| self.values[i])
    }

    fn req(&self, param: ShapeParam) -> f64 {
        // `new` guarantees every declared parameter is present.
        self.get(param).unwrap_or(f64::NAN)
    }

    fn validate(&self) -> Result<(), AppError> {
        for (&p, &v) in self.family.params().iter().zip(&self.values) {
            if !v.is_finite() {
                return Err(AppError::new(4, format!("{} {} is not finite", self.family.code(), p.as_str())));
            }
            let must_be_positive = matches!(
                p,
                ShapeParam::Sigma | ShapeParam::Sigma1 | ShapeParam::Sigma2 | ShapeParam::N | ShapeParam::N1 | ShapeParam::N2
            );
            let must_be_non_negative = matches!(p, ShapeParam::Width | ShapeParam::Width1 | ShapeParam::Width2);
            if (must_be_positive && v <= 0.0) || (must_be_non_negative && v < 0.0) {
                return Err(AppError::new(
                    4,
                    format!("{} {} out of range: {v}", self.family.code(), p.as_str()),
                ));
            }
        }
        Ok(())
    }

    /// Unnormalized shape at `x`. The peak value of every shape is 1 at its mean
    /// (up to the Voigt approximation).
    pub fn shape_value(&self, x: f64) -> f64 {
        use ShapeParam::*;
        let mean = self.req(Mean);
        let dx = x - mean;
        match self.family {
            ShapeFamily::Gaussian => gauss(dx, self.req(Sigma)),
            ShapeFamily::Voigtian => voigt(dx, self.req(Sigma), self.req(Width)),
            ShapeFamily::CrystalBall => {
                let t = dx / self.req(Sigma);
                crystal_ball_tail(-t, self.req(A), self.req(N))
            }
            ShapeFamily::DoubleCrystalBall => {
                let t = dx / self.req(Sigma);
                if t < 0.0 {
                    crystal_ball_tail(-t, self.req(A1), self.req(N1))
                } else {
                    crystal_ball_tail(t, self.req(A2), self.req(N2))
                }
            }
            ShapeFamily::DoubleSidedGaussian => {
                if dx < 0.0 { gauss(dx, self.req(Sigma1)) } else { gauss(dx, self.req(Sigma2)) }
            }
            ShapeFamily::DoubleSidedVoigtian => {
                let (sigma, width) = if dx < 0.0 {
                    (self.req(Sigma1), self.req(Width1))
                } else {
                    (self.req(Sigma2), self.req(Width2))
                };
                voigt(dx, sigma, width)
            }
        }
    }

    /// Density at `x`, normalized on `[lo, hi]`.
    pub fn density(&self, x: f64, lo: f64, hi: f64) -> Result<f64, AppError> {
        let norm = self.norm(lo, hi)?;
        if x < lo || x > hi {
            return Ok(0.0);
        }
        Ok(self.shape_value(x) / norm)
    }

    /// Integral of the unnormalized shape on `[lo, hi]`.
    pub fn norm(&self, lo: f64, hi: f64) -> Result<f64, AppError> {
        let norm = simpson(|x| self.shape_value(x), lo, hi, NORM_INTERVALS);
        if !(norm.is_finite() && norm > 0.0) {
            return Err(AppError::new(
                4,
                format!(
                    "{} normalization on [{lo}, {hi}] is not positive (got {norm})",
                    self.family.display_name()
                ),
            ));
        }
        Ok(norm)
    }
}

/// Gaussian core with unit peak.
fn gauss(dx: f64, sigma: f64) -> f64 {
    let t = dx / sigma;
    (-0.5 * t * t).exp()
}

/// Pseudo-Voigt profile (Thompson–Cox–Hastings), scaled to unit peak.
///
/// `width` is the Breit–Wigner full width; `sigma` the Gaussian resolution.
fn voigt(dx: f64, sigma: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return gauss(dx, sigma);
    }
    let gamma = 0.5 * width;
    let f_g = 2.0 * sigma * (2.0_f64 * 2.0_f64.ln()).sqrt();
    let f_l = width;

    let f5 = f_g.powi(5)
        + 2.69269 * f_g.powi(4) * f_l
        + 2.42843 * f_g.powi(3) * f_l.powi(2)
        + 4.47163 * f_g.powi(2) * f_l.powi(3)
        + 0.07842 * f_g * f_l.powi(4)
        + f_l.powi(5);
    let f_v = f5.powf(0.2);

    let ratio = f_l / f_v;
    let eta = (1.36603 * ratio - 0.47719 * ratio * ratio + 0.11116 * ratio.powi(3)).clamp(0.0, 1.0);

    let lorentz = gamma * gamma / (dx * dx + gamma * gamma);
    eta * lorentz + (1.0 - eta) * gauss(dx, sigma)
}

/// One Crystal Ball side in units of sigma: Gaussian core up to `alpha`,
/// power-law tail beyond it. `t >= 0` runs towards the tail.
fn crystal_ball_tail(t: f64, alpha: f64, n: f64) -> f64 {
    let alpha = alpha.abs();
    if t <= alpha || alpha == 0.0 {
        return (-0.5 * t * t).exp();
    }
    let a = (n / alpha).powf(n) * (-0.5 * alpha * alpha).exp();
    let b = n / alpha - alpha;
    a * (b + t).powf(-n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(family: ShapeFamily, values: &[f64]) -> ShapeParams {
        ShapeParams::new(family, values.to_vec()).unwrap()
    }

    #[test]
    fn every_family_peaks_at_mean() {
        let cases = [
            params(ShapeFamily::Gaussian, &[10.0, 0.5]),
            params(ShapeFamily::Voigtian, &[10.0, 0.2, 0.5]),
            params(ShapeFamily::CrystalBall, &[10.0, 0.5, 1.0, 2.0]),
            params(ShapeFamily::DoubleCrystalBall, &[10.0, 0.5, 1.0, 2.0, 1.5, 3.0]),
            params(ShapeFamily::DoubleSidedGaussian, &[10.0, 0.3, 0.8]),
            params(ShapeFamily::DoubleSidedVoigtian, &[10.0, 0.3, 0.8, 0.1, 0.2]),
        ];
        for p in &cases {
            let peak = p.shape_value(10.0);
            assert!((peak - 1.0).abs() < 1e-9, "{}: peak={peak}", p.family.code());
            assert!(p.shape_value(9.0) < peak);
            assert!(p.shape_value(11.0) < peak);
        }
    }

    #[test]
    fn crystal_ball_is_continuous_at_transition() {
        let p = params(ShapeFamily::CrystalBall, &[0.0, 1.0, 1.5, 3.0]);
        let left = p.shape_value(-1.5 + 1e-9);
        let right = p.shape_value(-1.5 - 1e-9);
        assert!((left - right).abs() < 1e-6);
        // Power-law tail is heavier than the Gaussian.
        assert!(p.shape_value(-5.0) > gauss(-5.0, 1.0));
    }

    #[test]
    fn double_sided_gaussian_uses_side_widths() {
        let p = params(ShapeFamily::DoubleSidedGaussian, &[0.0, 1.0, 2.0]);
        assert!((p.shape_value(-1.0) - gauss(-1.0, 1.0)).abs() < 1e-12);
        assert!((p.shape_value(2.0) - gauss(2.0, 2.0)).abs() < 1e-12);
    }

    #[test]
    fn gaussian_density_is_normalized() {
        let p = params(ShapeFamily::Gaussian, &[0.0, 1.0]);
        let d = p.density(0.0, -10.0, 10.0).unwrap();
        assert!((d - 1.0 / (2.0 * std::f64::consts::PI).sqrt()).abs() < 1e-9);
        assert_eq!(p.density(20.0, -10.0, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn voigt_without_width_is_gaussian() {
        let v = params(ShapeFamily::Voigtian, &[0.0, 0.0, 1.0]);
        assert!((v.shape_value(1.3) - gauss(1.3, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(ShapeParams::new(ShapeFamily::Gaussian, vec![0.0]).is_err());
        assert!(ShapeParams::new(ShapeFamily::Gaussian, vec![0.0, -1.0]).is_err());
        assert!(ShapeParams::new(ShapeFamily::Voigtian, vec![0.0, -0.1, 1.0]).is_err());
        assert!(ShapeParams::new(ShapeFamily::Gaussian, vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn get_reads_declared_parameters() {
        let p = params(ShapeFamily::DoubleSidedGaussian, &[5.0, 0.3, 0.8]);
        assert_eq!(p.get(ShapeParam::Sigma2), Some(0.8));
        assert_eq!(p.get(ShapeParam::Width), None);
    }
}

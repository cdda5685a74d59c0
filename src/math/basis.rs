//! Polynomial basis on a normalized mass variable.
//!
//! Masses in this analysis span very different scales (a few GeV for the light
//! boson, hundreds of GeV for the heavy one). Raising raw masses to powers makes
//! the design matrix badly conditioned, so polynomials are expressed in
//!
//! ```text
//! t = (m - shift) / scale
//! ```
//!
//! where `shift` is the grid midpoint and `scale` its half-width, which maps the
//! grid onto `[-1, 1]`.

/// Affine map from mass to the normalized polynomial variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassScaling {
    pub shift: f64,
    pub scale: f64,
}

impl MassScaling {
    /// Scaling that maps `[min, max]` onto `[-1, 1]`.
    ///
    /// A single-point or empty range falls back to `scale = 1`.
    pub fn from_range(min: f64, max: f64) -> Self {
        let shift = 0.5 * (min + max);
        let half = 0.5 * (max - min);
        let scale = if half.is_finite() && half > 0.0 { half } else { 1.0 };
        Self { shift, scale }
    }

    #[inline]
    pub fn apply(&self, m: f64) -> f64 {
        (m - self.shift) / self.scale
    }
}

/// Fill a design row `[1, t, t^2, ..., t^degree]`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`.
pub fn fill_poly_row(t: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "design row length must be degree + 1");
    let mut power = 1.0;
    for slot in out.iter_mut() {
        *slot = power;
        power *= t;
    }
}

/// Evaluate `c0 + c1 t + c2 t^2 + ...` with Horner's rule.
pub fn eval_poly(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly_row_powers() {
        let mut row = [0.0; 4];
        fill_poly_row(2.0, 3, &mut row);
        assert_eq!(row, [1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn horner_matches_naive_sum() {
        let c = [1.5, -2.0, 0.25];
        let t = 3.0;
        let naive = 1.5 - 2.0 * t + 0.25 * t * t;
        assert!((eval_poly(&c, t) - naive).abs() < 1e-12);
        assert_eq!(eval_poly(&[], t), 0.0);
    }

    #[test]
    fn scaling_maps_range_to_unit_interval() {
        let s = MassScaling::from_range(4.0, 21.0);
        assert!((s.apply(4.0) + 1.0).abs() < 1e-12);
        assert!((s.apply(21.0) - 1.0).abs() < 1e-12);

        let degenerate = MassScaling::from_range(7.0, 7.0);
        assert_eq!(degenerate.scale, 1.0);
        assert_eq!(degenerate.apply(7.0), 0.0);
    }
}

//! Composite signal templates.
//!
//! A template combines one interpolator per declared shape parameter (for both
//! observables) into a shape that can be evaluated at any light mass the
//! interpolation strategy allows.
//!
//! - direct mode: reduces exactly to the per-mass fit at each grid mass
//! - fit mode: follows the per-parameter polynomials between (and beyond) grid masses
//!
//! The yield integral is never smoothed: it passes through the grid yields in
//! both modes (linearly between grid masses in fit mode). Its polynomial fit is
//! kept for display only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    AnalysisConfig, Axis, GridPoint, GridSample, InterpMode, ParamKey, ScanKey, ShapeFamily, UncertaintyPolicy,
};
use crate::error::{AppError, InterpError};
use crate::fit::{DegreePlan, Interpolator, MassPartition, ParameterCurve, PolyFit, fit_polynomial};
use crate::models::model::ShapeParams;

/// Shape of a template at one mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateShape {
    pub mass: f64,
    pub x: ShapeParams,
    pub y: ShapeParams,
    pub integral: Option<f64>,
}

/// Continuous signal model over the light mass for one scan key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTemplate {
    pub name: String,
    pub key: ScanKey,
    pub x_family: ShapeFamily,
    pub y_family: ShapeFamily,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub mode: InterpMode,
    /// Grid masses the template was built from, ascending.
    pub grid_masses: Vec<f64>,
    /// Shared dense partition; `None` for a single-mass grid.
    pub partition: Option<MassPartition>,
    pub params: BTreeMap<ParamKey, Interpolator>,
    /// Grid yields; always `Interpolator::Direct`.
    pub integral: Option<Interpolator>,
    /// Polynomial through the yields (fit mode). Not used for evaluation.
    #[serde(default)]
    pub integral_fit: Option<PolyFit>,
}

impl CompositeTemplate {
    /// Build the template for `key` from its grid points.
    ///
    /// Any parameter failure aborts the whole template; no partial template is
    /// returned.
    pub fn build(config: &AnalysisConfig, key: &ScanKey, points: &[GridPoint]) -> Result<Self, AppError> {
        if points.is_empty() {
            return Err(AppError::new(3, format!("No grid points for {key}.")));
        }

        let mut grid_masses: Vec<f64> = points.iter().map(|p| p.mass).collect();
        grid_masses.sort_by(|a, b| a.total_cmp(b));
        let (lo, hi) = (grid_masses[0], grid_masses[grid_masses.len() - 1]);
        let partition = if hi > lo {
            Some(MassPartition::uniform(lo, hi, config.resolution)?)
        } else {
            None
        };

        let plan = DegreePlan::from_config(config);
        let mut params = BTreeMap::new();
        for param_key in config.param_keys() {
            let samples = collect_samples(points, param_key)?;
            let degree = plan.degree_for(param_key);
            let interp = Interpolator::build(config.mode, &samples, degree, config.uncertainty)
                .map_err(|e| AppError::from(e).context(param_key))?;
            debug!(template = %key.template_name(), param = %param_key, degree, "parameter interpolated");
            params.insert(param_key, interp);
        }

        let integral = build_integral(points)?;
        let integral_fit = match (&integral, config.mode) {
            (Some(interp), InterpMode::Fit) => fit_integral(key, interp, &plan),
            _ => None,
        };

        Ok(Self {
            name: key.template_name(),
            key: key.clone(),
            x_family: config.x_family,
            y_family: config.y_family,
            x_range: config.range(Axis::X),
            y_range: config.range(Axis::Y),
            mode: config.mode,
            grid_masses,
            partition,
            params,
            integral,
            integral_fit,
        })
    }

    pub fn grid_masses(&self) -> &[f64] {
        &self.grid_masses
    }

    pub fn family(&self, axis: Axis) -> ShapeFamily {
        match axis {
            Axis::X => self.x_family,
            Axis::Y => self.y_family,
        }
    }

    fn shape_params(&self, axis: Axis, m: f64) -> Result<ShapeParams, AppError> {
        let family = self.family(axis);
        let mut values = Vec::with_capacity(family.params().len());
        for &p in family.params() {
            let key = ParamKey::new(axis, p);
            let interp = self
                .params
                .get(&key)
                .ok_or_else(|| AppError::new(2, format!("Template {} has no curve for {key}", self.name)))?;
            values.push(interp.value_at(m).map_err(|e| AppError::from(e).context(key))?);
        }
        ShapeParams::new(family, values).map_err(|e| e.context(format!("{} at mass {m}", self.name)))
    }

    /// Full shape at light mass `m`.
    ///
    /// Fit mode extrapolates the shape beyond the grid; the yield is unknown
    /// there and left empty.
    pub fn shape_at(&self, m: f64) -> Result<TemplateShape, AppError> {
        let x = self.shape_params(Axis::X, m)?;
        let y = self.shape_params(Axis::Y, m)?;
        let integral = match self.integral_at(m) {
            Err(InterpError::UnknownQueryMass { .. }) if self.mode == InterpMode::Fit => None,
            other => other?,
        };
        Ok(TemplateShape { mass: m, x, y, integral })
    }

    /// Signal yield at `m`, if the grid carried integrals.
    ///
    /// Grid masses return the grid yield in both modes. Fit mode reads linearly
    /// between grid masses and fails outside the grid range.
    pub fn integral_at(&self, m: f64) -> Result<Option<f64>, InterpError> {
        self.integral
            .as_ref()
            .map(|i| match self.mode {
                InterpMode::Direct => i.value_at(m),
                InterpMode::Fit => i.linear_at(m),
            })
            .transpose()
    }

    /// Normalized 2D density at `(x, y)` for light mass `m`.
    pub fn density_at(&self, m: f64, x: f64, y: f64) -> Result<f64, AppError> {
        let shape = self.shape_at(m)?;
        let dx = shape.x.density(x, self.x_range.0, self.x_range.1)?;
        let dy = shape.y.density(y, self.y_range.0, self.y_range.1)?;
        Ok(dx * dy)
    }

    /// One sampled curve per parameter (all on the shared partition in fit mode).
    pub fn curves(&self) -> Vec<(String, ParameterCurve)> {
        let Some(partition) = self.partition.or_else(|| self.single_point_partition()) else {
            return Vec::new();
        };
        let mut out: Vec<(String, ParameterCurve)> = self
            .params
            .iter()
            .map(|(k, interp)| (k.to_string(), interp.curve(&partition)))
            .collect();
        if let Some(interp) = &self.integral {
            let curve = match self.mode {
                InterpMode::Direct => interp.curve(&partition),
                InterpMode::Fit => interp.linear_curve(&partition),
            };
            out.push(("integral".to_string(), curve));
        }
        out
    }

    /// Curve of one parameter (`xmean`, `ysigma1`, `integral`, ...).
    pub fn curve(&self, name: &str) -> Option<ParameterCurve> {
        self.curves().into_iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Grid values one curve was built from (`xmean`, ..., `integral`).
    pub fn grid_samples(&self, name: &str) -> Option<Vec<GridSample>> {
        let interp = if name == "integral" {
            self.integral.as_ref()?
        } else {
            self.params.get(&name.parse::<ParamKey>().ok()?)?
        };
        Some(interp.grid().to_vec())
    }

    // Direct curves ignore the partition; this just satisfies the signature.
    fn single_point_partition(&self) -> Option<MassPartition> {
        let m = *self.grid_masses.first()?;
        Some(MassPartition { min: m, max: m, intervals: 1 })
    }
}

fn collect_samples(points: &[GridPoint], key: ParamKey) -> Result<Vec<GridSample>, AppError> {
    points
        .iter()
        .map(|p| {
            let est = p
                .params
                .get(&key)
                .ok_or_else(|| AppError::new(2, format!("Missing parameter {key} at mass {}.", p.mass)))?;
            Ok(GridSample {
                mass: p.mass,
                value: est.value,
                error: est.error,
            })
        })
        .collect()
}

fn build_integral(points: &[GridPoint]) -> Result<Option<Interpolator>, AppError> {
    let with_integral = points.iter().filter(|p| p.integral.is_some()).count();
    if with_integral == 0 {
        return Ok(None);
    }
    if with_integral != points.len() {
        return Err(AppError::new(
            2,
            format!("integral given for {with_integral} of {} masses.", points.len()),
        ));
    }

    let samples: Vec<GridSample> = points
        .iter()
        .map(|p| GridSample {
            mass: p.mass,
            value: p.integral.unwrap_or(f64::NAN),
            error: None,
        })
        .collect();

    Interpolator::direct(&samples)
        .map(Some)
        .map_err(|e| AppError::from(e).context("integral"))
}

// Yields carry no per-mass uncertainty; every point counts equally.
fn fit_integral(key: &ScanKey, yields: &Interpolator, plan: &DegreePlan) -> Option<PolyFit> {
    match fit_polynomial(yields.grid(), plan.integral_degree(), UncertaintyPolicy::Unweighted) {
        Ok(fit) => Some(fit),
        Err(err) => {
            warn!(template = %key.template_name(), "integral display fit failed: {err}");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Estimate, ShapeParam};

    /// Smooth toy grid: x Voigtian and y double-sided Gaussian, linear means.
    pub(crate) fn toy_points(masses: &[f64]) -> Vec<GridPoint> {
        masses
            .iter()
            .map(|&a| {
                let mut params = BTreeMap::new();
                let mut put = |axis, p, value: f64| {
                    params.insert(ParamKey::new(axis, p), Estimate { value, error: Some(0.01 * value.abs().max(0.1)) });
                };
                put(Axis::X, ShapeParam::Mean, a);
                put(Axis::X, ShapeParam::Width, 0.01 * a);
                put(Axis::X, ShapeParam::Sigma, 0.02 * a + 0.001 * a * a);
                put(Axis::Y, ShapeParam::Mean, 120.0 + 0.1 * a);
                put(Axis::Y, ShapeParam::Sigma1, 5.0 + 0.05 * a);
                put(Axis::Y, ShapeParam::Sigma2, 8.0 + 0.002 * a * a);
                GridPoint {
                    mass: a,
                    params,
                    integral: Some(100.0 + 2.0 * a),
                }
            })
            .collect()
    }

    fn config(mode: InterpMode) -> AnalysisConfig {
        AnalysisConfig {
            mode,
            y_range: [50.0, 200.0],
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn direct_template_reproduces_grid_exactly() {
        let masses = [5.0, 7.0, 9.0, 11.0];
        let points = toy_points(&masses);
        let key = ScanKey::new("PP", "", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).unwrap();
        assert_eq!(t.name, "HToAAH125AX_PP");

        for p in &points {
            let shape = t.shape_at(p.mass).unwrap();
            for (axis, params) in [(Axis::X, &shape.x), (Axis::Y, &shape.y)] {
                for &sp in params.family.params() {
                    let expected = p.params[&ParamKey::new(axis, sp)].value;
                    assert_eq!(params.get(sp).unwrap(), expected);
                }
            }
            assert_eq!(shape.integral, p.integral);
        }
        assert!(t.shape_at(6.0).is_err());
    }

    #[test]
    fn fit_template_tracks_grid_and_interpolates() {
        let masses = [5.0, 7.0, 9.0, 11.0, 13.0, 15.0];
        let points = toy_points(&masses);
        let key = ScanKey::new("FP", "IDUp", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Fit), &key, &points).unwrap();

        let shape = t.shape_at(8.0).unwrap();
        assert!((shape.x.get(ShapeParam::Mean).unwrap() - 8.0).abs() < 1e-6);
        assert!((shape.y.get(ShapeParam::Sigma2).unwrap() - (8.0 + 0.002 * 64.0)).abs() < 1e-6);
        assert!((shape.integral.unwrap() - 116.0).abs() < 1e-6);

        let curves = t.curves();
        assert_eq!(curves.len(), 7);
        let first = &curves[0].1.masses;
        assert_eq!(first.len(), 101);
        assert!(curves.iter().all(|(_, c)| &c.masses == first));
    }

    #[test]
    fn fit_mode_integral_keeps_grid_yields() {
        let masses = [5.0, 7.0, 9.0, 11.0, 13.0];
        let mut points = toy_points(&masses);
        // Yields off any quadratic, so a pol2 regression would not pass through them.
        for (p, y) in points.iter_mut().zip([110.0, 131.0, 118.0, 140.0, 126.0]) {
            p.integral = Some(y);
        }
        let key = ScanKey::new("PP", "", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Fit), &key, &points).unwrap();

        for p in &points {
            assert_eq!(t.integral_at(p.mass).unwrap(), p.integral);
        }
        assert!((t.integral_at(6.0).unwrap().unwrap() - 120.5).abs() < 1e-9);
        assert!(t.integral_at(4.0).is_err());
        let beyond = t.shape_at(4.0).unwrap();
        assert!(beyond.integral.is_none());
        assert!((beyond.x.get(ShapeParam::Mean).unwrap() - 4.0).abs() < 1e-6);

        let display = t.integral_fit.as_ref().unwrap();
        assert_eq!(display.degree(), 2);
        assert!((display.eval(7.0) - 131.0).abs() > 1e-3);
    }

    #[test]
    fn direct_mode_has_no_integral_display_fit() {
        let points = toy_points(&[5.0, 7.0, 9.0]);
        let key = ScanKey::new("PP", "", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).unwrap();
        assert!(t.integral_fit.is_none());
    }

    #[test]
    fn parameter_errors_name_the_parameter_not_the_template() {
        let points = toy_points(&[5.0, 7.0]);
        let key = ScanKey::new("PP", "", 125);
        let err = CompositeTemplate::build(&config(InterpMode::Fit), &key, &points).unwrap_err();
        assert!(!err.message().contains("HToAAH125AX_PP"));
        assert!(err.message().starts_with('x'));
    }

    #[test]
    fn density_is_product_of_axis_densities() {
        let points = toy_points(&[5.0, 7.0, 9.0]);
        let key = ScanKey::new("PP", "", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).unwrap();
        let at_peak = t.density_at(7.0, 7.0, 120.7).unwrap();
        let off_peak = t.density_at(7.0, 9.0, 160.0).unwrap();
        assert!(at_peak > 0.0);
        assert!(at_peak > off_peak);
    }

    #[test]
    fn missing_parameter_aborts_template() {
        let mut points = toy_points(&[5.0, 7.0, 9.0]);
        points[1].params.remove(&ParamKey::new(Axis::Y, ShapeParam::Sigma1));
        let key = ScanKey::new("PP", "", 125);
        let err = CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).unwrap_err();
        assert!(err.message().contains("ysigma1"));
    }

    #[test]
    fn underdetermined_fit_aborts_template() {
        let points = toy_points(&[5.0, 7.0]);
        let key = ScanKey::new("PP", "", 125);
        let err = CompositeTemplate::build(&config(InterpMode::Fit), &key, &points).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("insufficient grid points"));
    }

    #[test]
    fn single_mass_direct_template_has_no_partition() {
        let points = toy_points(&[7.0]);
        let key = ScanKey::new("PP", "", 125);
        let t = CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).unwrap();
        assert!(t.partition.is_none());
        assert_eq!(t.curve("xmean").unwrap().masses, vec![7.0]);
    }

    #[test]
    fn partial_integrals_are_rejected() {
        let mut points = toy_points(&[5.0, 7.0, 9.0]);
        points[0].integral = None;
        let key = ScanKey::new("PP", "", 125);
        assert!(CompositeTemplate::build(&config(InterpMode::Direct), &key, &points).is_err());
    }
}

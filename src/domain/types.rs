//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while building templates
//! - exported to JSON/CSV
//! - reloaded later for evaluation or plotting

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which observable a shape parameter belongs to.
///
/// `x` is the di-muon mass, `y` the second (visible or four-body) mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    pub fn prefix(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }
}

/// Named shape parameter. The closed set covers every shape family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeParam {
    Mean,
    Width,
    Sigma,
    A,
    N,
    A1,
    N1,
    A2,
    N2,
    Sigma1,
    Sigma2,
    Width1,
    Width2,
}

impl ShapeParam {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeParam::Mean => "mean",
            ShapeParam::Width => "width",
            ShapeParam::Sigma => "sigma",
            ShapeParam::A => "a",
            ShapeParam::N => "n",
            ShapeParam::A1 => "a1",
            ShapeParam::N1 => "n1",
            ShapeParam::A2 => "a2",
            ShapeParam::N2 => "n2",
            ShapeParam::Sigma1 => "sigma1",
            ShapeParam::Sigma2 => "sigma2",
            ShapeParam::Width1 => "width1",
            ShapeParam::Width2 => "width2",
        }
    }

    const ALL: [ShapeParam; 13] = [
        ShapeParam::Mean,
        ShapeParam::Width,
        ShapeParam::Sigma,
        ShapeParam::A,
        ShapeParam::N,
        ShapeParam::A1,
        ShapeParam::N1,
        ShapeParam::A2,
        ShapeParam::N2,
        ShapeParam::Sigma1,
        ShapeParam::Sigma2,
        ShapeParam::Width1,
        ShapeParam::Width2,
    ];
}

impl FromStr for ShapeParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeParam::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown shape parameter '{s}'"))
    }
}

/// Shape family used for one observable.
///
/// Each family declares a fixed, ordered parameter list; the order is also the
/// order of `ShapeParams::values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ShapeFamily {
    #[serde(rename = "G")]
    #[value(name = "G", alias = "gaussian")]
    Gaussian,
    #[serde(rename = "V")]
    #[value(name = "V", alias = "voigtian")]
    Voigtian,
    #[serde(rename = "CB")]
    #[value(name = "CB", alias = "crystalball")]
    CrystalBall,
    #[serde(rename = "DCB")]
    #[value(name = "DCB")]
    DoubleCrystalBall,
    #[serde(rename = "DG")]
    #[value(name = "DG")]
    DoubleSidedGaussian,
    #[serde(rename = "DV")]
    #[value(name = "DV")]
    DoubleSidedVoigtian,
}

impl ShapeFamily {
    /// Declared parameter list, in evaluation order.
    pub fn params(self) -> &'static [ShapeParam] {
        use ShapeParam::*;
        match self {
            ShapeFamily::Gaussian => &[Mean, Sigma],
            ShapeFamily::Voigtian => &[Mean, Width, Sigma],
            ShapeFamily::CrystalBall => &[Mean, Sigma, A, N],
            ShapeFamily::DoubleCrystalBall => &[Mean, Sigma, A1, N1, A2, N2],
            ShapeFamily::DoubleSidedGaussian => &[Mean, Sigma1, Sigma2],
            ShapeFamily::DoubleSidedVoigtian => &[Mean, Sigma1, Sigma2, Width1, Width2],
        }
    }

    /// Short code used on the command line and in file names.
    pub fn code(self) -> &'static str {
        match self {
            ShapeFamily::Gaussian => "G",
            ShapeFamily::Voigtian => "V",
            ShapeFamily::CrystalBall => "CB",
            ShapeFamily::DoubleCrystalBall => "DCB",
            ShapeFamily::DoubleSidedGaussian => "DG",
            ShapeFamily::DoubleSidedVoigtian => "DV",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ShapeFamily::Gaussian => "Gaussian",
            ShapeFamily::Voigtian => "Voigtian",
            ShapeFamily::CrystalBall => "Crystal Ball",
            ShapeFamily::DoubleCrystalBall => "Double Crystal Ball",
            ShapeFamily::DoubleSidedGaussian => "Double-sided Gaussian",
            ShapeFamily::DoubleSidedVoigtian => "Double-sided Voigtian",
        }
    }
}

/// A parameter of one observable's shape, printed as `xmean`, `ysigma1`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub axis: Axis,
    pub param: ShapeParam,
}

impl ParamKey {
    pub fn new(axis: Axis, param: ShapeParam) -> Self {
        Self { axis, param }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.axis.prefix(), self.param.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let axis = match s.chars().next() {
            Some('x') => Axis::X,
            Some('y') => Axis::Y,
            _ => return Err(format!("parameter '{s}' must start with 'x' or 'y'")),
        };
        let param = s[1..].parse::<ShapeParam>()?;
        Ok(ParamKey { axis, param })
    }
}

impl Serialize for ParamKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ParamKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How parameter values are carried from the grid to the continuum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterpMode {
    /// Carry grid values through unchanged; only grid masses can be queried.
    Direct,
    /// Weighted polynomial regression per parameter, sampled on a dense partition.
    Fit,
}

/// What to do with points whose uncertainty is zero, missing or non-finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UncertaintyPolicy {
    /// Use `max(σ, min_sigma)`; unusable σ becomes `min_sigma`.
    Floor { min_sigma: f64 },
    /// Give the point zero weight.
    Skip,
    /// Ignore uncertainties entirely (weight 1 everywhere).
    Unweighted,
}

impl Default for UncertaintyPolicy {
    fn default() -> Self {
        UncertaintyPolicy::Floor { min_sigma: DEFAULT_MIN_SIGMA }
    }
}

/// Default uncertainty floor for [`UncertaintyPolicy::Floor`].
pub const DEFAULT_MIN_SIGMA: f64 = 1e-6;

/// CLI selector for [`UncertaintyPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UncertaintyMode {
    Floor,
    Skip,
    Unweighted,
}

impl UncertaintyMode {
    pub fn to_policy(self, min_sigma: f64) -> UncertaintyPolicy {
        match self {
            UncertaintyMode::Floor => UncertaintyPolicy::Floor { min_sigma },
            UncertaintyMode::Skip => UncertaintyPolicy::Skip,
            UncertaintyMode::Unweighted => UncertaintyPolicy::Unweighted,
        }
    }
}

/// Run-level reaction to a failed scan point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failing template.
    Abort,
    /// Record the failure and continue with the next scan point.
    Skip,
}

/// Parse a mass label as used in sample names: `3p6` is 3.6, `15` is 15.
pub fn parse_mass_label(label: &str) -> Result<f64, String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err("empty mass label".to_string());
    }
    let normalized = trimmed.replace('p', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| format!("invalid mass label '{trimmed}'"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("mass label '{trimmed}' must be a positive number"));
    }
    Ok(value)
}

/// Format a mass the way sample names do (`3.6` -> `3p6`, `15.0` -> `15`).
pub fn format_mass_label(mass: f64) -> String {
    if mass.fract() == 0.0 {
        format!("{}", mass as i64)
    } else {
        format!("{mass}").replace('.', "p")
    }
}

/// Light masses dropped for heavy masses above a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightMassExclusion {
    /// Applies when `h > above_h`.
    pub above_h: u32,
    pub a_masses: Vec<String>,
}

/// One `(region, shift, h)` combination; one template is built per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanKey {
    pub region: String,
    /// Empty for the central value, otherwise e.g. `PileupUp`.
    pub shift: String,
    pub h: u32,
}

impl ScanKey {
    pub fn new(region: impl Into<String>, shift: impl Into<String>, h: u32) -> Self {
        Self {
            region: region.into(),
            shift: shift.into(),
            h,
        }
    }

    /// `PP` or `PP_PileupUp`.
    pub fn tag(&self) -> String {
        if self.shift.is_empty() {
            self.region.clone()
        } else {
            format!("{}_{}", self.region, self.shift)
        }
    }

    /// Name of the template built for this key, e.g. `HToAAH125AX_PP_IDUp`.
    pub fn template_name(&self) -> String {
        format!("{}_{}", template_base_name(self.h), self.tag())
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shift = if self.shift.is_empty() { "central" } else { &self.shift };
        write!(f, "region={} shift={} h={}", self.region, shift, self.h)
    }
}

/// `HToAAH{h}AX`: the signal process whose light mass is the free spline variable.
pub fn template_base_name(h: u32) -> String {
    format!("HToAAH{h}AX")
}

/// Name of one simulated signal sample, e.g. `HToAAH125A3p6`.
pub fn signal_name(h: u32, a: f64) -> String {
    format!("HToAAH{h}A{}", format_mass_label(a))
}

/// Fitted value of one parameter at one grid mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    /// Fit uncertainty; `None` when the fitter did not report one.
    pub error: Option<f64>,
}

/// A discrete mass hypothesis with its fitted parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub mass: f64,
    pub params: BTreeMap<ParamKey, Estimate>,
    /// Signal yield of the sample (sum of weights in range).
    pub integral: Option<f64>,
}

/// A single `(mass, value, uncertainty)` triple for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSample {
    pub mass: f64,
    pub value: f64,
    pub error: Option<f64>,
}

/// Immutable analysis configuration, threaded by reference through every build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Observable ranges used to normalize densities.
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],

    pub regions: Vec<String>,
    /// Systematic shift names; each expands to `{name}Up` / `{name}Down`.
    pub shifts: Vec<String>,
    pub h_masses: Vec<u32>,
    /// Light-mass labels (`3p6`, `4`, ...).
    pub a_masses: Vec<String>,
    pub exclusions: Vec<LightMassExclusion>,

    pub x_family: ShapeFamily,
    pub y_family: ShapeFamily,

    pub mode: InterpMode,
    /// Number of equal intervals in the dense mass partition (fit mode).
    pub resolution: usize,
    /// Per-parameter degree overrides, keyed as `xmean`, `ysigma1`, `integral`.
    pub degrees: BTreeMap<String, usize>,
    pub uncertainty: UncertaintyPolicy,
    pub on_error: ErrorPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            x_range: [2.5, 30.0],
            y_range: [0.0, 1200.0],
            regions: vec!["FP".to_string(), "PP".to_string()],
            shifts: ["Pileup", "ID", "Iso", "Fake"].iter().map(|s| s.to_string()).collect(),
            h_masses: vec![125, 300, 750],
            a_masses: ["3p6", "4", "5", "6", "7", "9", "11", "13", "15", "17", "19", "21"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclusions: vec![LightMassExclusion {
                above_h: 125,
                a_masses: vec!["3p6".to_string(), "4".to_string(), "6".to_string()],
            }],
            x_family: ShapeFamily::Voigtian,
            y_family: ShapeFamily::DoubleSidedGaussian,
            mode: InterpMode::Direct,
            resolution: 100,
            degrees: BTreeMap::new(),
            uncertainty: UncertaintyPolicy::default(),
            on_error: ErrorPolicy::Abort,
        }
    }
}

impl AnalysisConfig {
    /// Check internal consistency. Called once before the config is shared.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, range) in [("x_range", self.x_range), ("y_range", self.y_range)] {
            if !(range[0].is_finite() && range[1].is_finite() && range[1] > range[0]) {
                return Err(AppError::new(
                    2,
                    format!("Invalid {name}: [{}, {}] (must be finite with max > min).", range[0], range[1]),
                ));
            }
        }
        if self.regions.is_empty() {
            return Err(AppError::new(2, "At least one region is required."));
        }
        if self.h_masses.is_empty() {
            return Err(AppError::new(2, "At least one heavy mass is required."));
        }
        if self.resolution == 0 {
            return Err(AppError::new(2, "Resolution must be >= 1 interval."));
        }
        if let UncertaintyPolicy::Floor { min_sigma } = self.uncertainty {
            if !(min_sigma.is_finite() && min_sigma > 0.0) {
                return Err(AppError::new(2, format!("Invalid uncertainty floor {min_sigma} (must be > 0).")));
            }
        }
        for label in self.a_masses.iter().chain(self.exclusions.iter().flat_map(|e| e.a_masses.iter())) {
            parse_mass_label(label).map_err(|e| AppError::new(2, e))?;
        }
        for key in self.degrees.keys() {
            if key != "integral" {
                key.parse::<ParamKey>().map_err(|e| AppError::new(2, format!("Invalid degree override: {e}")))?;
            }
        }
        Ok(())
    }

    /// Light masses scanned for heavy mass `h`, ascending.
    pub fn a_masses_for(&self, h: u32) -> Result<Vec<f64>, AppError> {
        let mut excluded = Vec::new();
        for ex in self.exclusions.iter().filter(|ex| h > ex.above_h) {
            for label in &ex.a_masses {
                excluded.push(parse_mass_label(label).map_err(|e| AppError::new(2, e))?);
            }
        }

        let mut out = Vec::with_capacity(self.a_masses.len());
        for label in &self.a_masses {
            let a = parse_mass_label(label).map_err(|e| AppError::new(2, e))?;
            if !excluded.iter().any(|&x| (x - a).abs() < 1e-9) {
                out.push(a);
            }
        }
        out.sort_by(|a, b| a.total_cmp(b));
        Ok(out)
    }

    /// Shift variants in build order: central first, then `Up`/`Down` per shift.
    pub fn shift_variants(&self) -> Vec<String> {
        let mut out = vec![String::new()];
        for s in &self.shifts {
            out.push(format!("{s}Up"));
            out.push(format!("{s}Down"));
        }
        out
    }

    /// Every scan key in build order (region, then shift, then h).
    pub fn scan_keys(&self) -> Vec<ScanKey> {
        let shifts = self.shift_variants();
        let mut out = Vec::new();
        for region in &self.regions {
            for shift in &shifts {
                for &h in &self.h_masses {
                    out.push(ScanKey::new(region.clone(), shift.clone(), h));
                }
            }
        }
        out
    }

    /// Observable range for an axis.
    pub fn range(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => (self.x_range[0], self.x_range[1]),
            Axis::Y => (self.y_range[0], self.y_range[1]),
        }
    }

    /// Shape family for an axis.
    pub fn family(&self, axis: Axis) -> ShapeFamily {
        match axis {
            Axis::X => self.x_family,
            Axis::Y => self.y_family,
        }
    }

    /// Every parameter key the configured families declare (x first).
    pub fn param_keys(&self) -> Vec<ParamKey> {
        Axis::ALL
            .into_iter()
            .flat_map(|axis| self.family(axis).params().iter().map(move |&p| ParamKey::new(axis, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_labels_round_trip_decimal_point() {
        assert_eq!(parse_mass_label("3p6").unwrap(), 3.6);
        assert_eq!(parse_mass_label("15").unwrap(), 15.0);
        assert!(parse_mass_label("").is_err());
        assert!(parse_mass_label("abc").is_err());
        assert!(parse_mass_label("-4").is_err());
        assert_eq!(format_mass_label(3.6), "3p6");
        assert_eq!(format_mass_label(21.0), "21");
        assert_eq!(signal_name(125, 3.6), "HToAAH125A3p6");
    }

    #[test]
    fn param_key_parses_and_prints() {
        let k: ParamKey = "ysigma1".parse().unwrap();
        assert_eq!(k, ParamKey::new(Axis::Y, ShapeParam::Sigma1));
        assert_eq!(k.to_string(), "ysigma1");
        assert!("zmean".parse::<ParamKey>().is_err());
        assert!("xbogus".parse::<ParamKey>().is_err());
    }

    #[test]
    fn families_declare_fixed_parameter_lists() {
        assert_eq!(ShapeFamily::Gaussian.params().len(), 2);
        assert_eq!(ShapeFamily::DoubleCrystalBall.params().len(), 6);
        for fam in [
            ShapeFamily::Gaussian,
            ShapeFamily::Voigtian,
            ShapeFamily::CrystalBall,
            ShapeFamily::DoubleCrystalBall,
            ShapeFamily::DoubleSidedGaussian,
            ShapeFamily::DoubleSidedVoigtian,
        ] {
            assert_eq!(fam.params()[0], ShapeParam::Mean, "{} must lead with mean", fam.code());
        }
    }

    #[test]
    fn heavy_masses_drop_excluded_light_masses() {
        let config = AnalysisConfig::default();
        let low = config.a_masses_for(125).unwrap();
        let high = config.a_masses_for(300).unwrap();
        assert_eq!(low.len(), 12);
        assert_eq!(high.len(), 9);
        assert!(!high.contains(&3.6));
        assert!(high.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn scan_keys_expand_shifts() {
        let config = AnalysisConfig {
            regions: vec!["PP".into()],
            shifts: vec!["ID".into()],
            h_masses: vec![125],
            ..AnalysisConfig::default()
        };
        let keys = config.scan_keys();
        let tags: Vec<String> = keys.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, vec!["PP", "PP_IDUp", "PP_IDDown"]);
        assert_eq!(keys[1].template_name(), "HToAAH125AX_PP_IDUp");
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let bad = AnalysisConfig { resolution: 0, ..AnalysisConfig::default() };
        assert_eq!(bad.validate().unwrap_err().exit_code(), 2);

        let bad = AnalysisConfig { x_range: [5.0, 1.0], ..AnalysisConfig::default() };
        assert!(bad.validate().is_err());

        let bad = AnalysisConfig {
            uncertainty: UncertaintyPolicy::Floor { min_sigma: 0.0 },
            ..AnalysisConfig::default()
        };
        assert!(bad.validate().is_err());

        let mut degrees = BTreeMap::new();
        degrees.insert("qmean".to_string(), 1);
        let bad = AnalysisConfig { degrees, ..AnalysisConfig::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{ "regions": ["PP"], "y_family": "V", "mode": "fit",
                        "uncertainty": { "kind": "skip" } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.regions, vec!["PP"]);
        assert_eq!(config.y_family, ShapeFamily::Voigtian);
        assert_eq!(config.mode, InterpMode::Fit);
        assert_eq!(config.uncertainty, UncertaintyPolicy::Skip);
        assert_eq!(config.resolution, 100);
    }
}

//! Fit-result tables: the per-mass shape fits, grouped by scan key.

use std::collections::BTreeMap;

use crate::domain::types::{Estimate, GridPoint, ParamKey, ScanKey};
use crate::error::AppError;

/// Tolerance used when matching light masses between records and the config.
const MASS_TOL: f64 = 1e-9;

/// What a record carries: a shape parameter or the sample yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordTarget {
    Param(ParamKey),
    Integral,
}

impl std::fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordTarget::Param(k) => write!(f, "{k}"),
            RecordTarget::Integral => write!(f, "integral"),
        }
    }
}

/// One row of the fit-result table.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRecord {
    pub key: ScanKey,
    pub a: f64,
    pub target: RecordTarget,
    pub value: f64,
    pub error: Option<f64>,
}

/// All grid points, grouped by scan key and ordered by light mass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridTable {
    groups: BTreeMap<ScanKey, Vec<GridPoint>>,
}

impl GridTable {
    /// Group records. A repeated `(key, a, param)` is an input error.
    pub fn from_records(records: &[GridRecord]) -> Result<Self, AppError> {
        let mut groups: BTreeMap<ScanKey, Vec<GridPoint>> = BTreeMap::new();
        for r in records {
            let points = groups.entry(r.key.clone()).or_default();
            let idx = match points.iter().position(|p| (p.mass - r.a).abs() <= MASS_TOL) {
                Some(i) => i,
                None => {
                    points.push(GridPoint {
                        mass: r.a,
                        params: BTreeMap::new(),
                        integral: None,
                    });
                    points.len() - 1
                }
            };
            let point = &mut points[idx];
            let duplicate = match r.target {
                RecordTarget::Param(k) => point
                    .params
                    .insert(k, Estimate { value: r.value, error: r.error })
                    .is_some(),
                RecordTarget::Integral => point.integral.replace(r.value).is_some(),
            };
            if duplicate {
                return Err(AppError::new(
                    2,
                    format!("Duplicate {} for {} at a={}.", r.target, r.key, r.a),
                ));
            }
        }
        for points in groups.values_mut() {
            points.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        }
        Ok(Self { groups })
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScanKey> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every grid point recorded for `key`.
    pub fn points(&self, key: &ScanKey) -> &[GridPoint] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Grid points for `key` restricted to `a_masses`.
    ///
    /// Fails when one of the requested masses has no record at all.
    pub fn select(&self, key: &ScanKey, a_masses: &[f64]) -> Result<Vec<GridPoint>, AppError> {
        let available = self.points(key);
        if available.is_empty() {
            return Err(AppError::new(3, format!("No grid data for {key}.")));
        }
        a_masses
            .iter()
            .map(|&a| {
                available
                    .iter()
                    .find(|p| (p.mass - a).abs() <= MASS_TOL)
                    .cloned()
                    .ok_or_else(|| AppError::new(3, format!("No grid data for {key} at a={a}.")))
            })
            .collect()
    }
}

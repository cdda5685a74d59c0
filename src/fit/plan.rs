//! Polynomial degree per parameter.
//!
//! The degree is a modeling choice, not something derived from the data:
//! location parameters move linearly with the light mass, width-like
//! parameters (and tail parameters) get a quadratic.

use std::collections::BTreeMap;

use crate::domain::{AnalysisConfig, ParamKey, ShapeParam};

/// Degree used for location parameters (`mean`).
pub const LOCATION_DEGREE: usize = 1;
/// Degree used for every other shape parameter and the yield integral.
pub const SHAPE_DEGREE: usize = 2;

/// Key used for the integral in `AnalysisConfig::degrees`.
pub const INTEGRAL_KEY: &str = "integral";

/// Resolved degree per parameter key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DegreePlan {
    overrides: BTreeMap<String, usize>,
}

impl DegreePlan {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            overrides: config.degrees.clone(),
        }
    }

    pub fn degree_for(&self, key: ParamKey) -> usize {
        if let Some(&d) = self.overrides.get(&key.to_string()) {
            return d;
        }
        match key.param {
            ShapeParam::Mean => LOCATION_DEGREE,
            _ => SHAPE_DEGREE,
        }
    }

    pub fn integral_degree(&self) -> usize {
        self.overrides.get(INTEGRAL_KEY).copied().unwrap_or(SHAPE_DEGREE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Axis;

    #[test]
    fn defaults_follow_parameter_role() {
        let plan = DegreePlan::default();
        assert_eq!(plan.degree_for(ParamKey::new(Axis::X, ShapeParam::Mean)), 1);
        assert_eq!(plan.degree_for(ParamKey::new(Axis::Y, ShapeParam::Sigma1)), 2);
        assert_eq!(plan.degree_for(ParamKey::new(Axis::Y, ShapeParam::N2)), 2);
        assert_eq!(plan.integral_degree(), 2);
    }

    #[test]
    fn config_overrides_win() {
        let mut config = AnalysisConfig::default();
        config.degrees.insert("ymean".to_string(), 3);
        config.degrees.insert(INTEGRAL_KEY.to_string(), 1);
        let plan = DegreePlan::from_config(&config);
        assert_eq!(plan.degree_for(ParamKey::new(Axis::Y, ShapeParam::Mean)), 3);
        assert_eq!(plan.degree_for(ParamKey::new(Axis::X, ShapeParam::Mean)), 1);
        assert_eq!(plan.integral_degree(), 1);
    }
}

//! Read/write template JSON files.
//!
//! Template JSON is the portable representation of a build:
//! - run metadata (tool, generation time, the knobs that shaped the templates)
//! - every template with its interpolators, tagged `direct` / `fitted`
//!
//! Reloading yields templates that evaluate identically to the ones written.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisConfig, InterpMode, ShapeFamily, UncertaintyPolicy};
use crate::error::AppError;
use crate::models::CompositeTemplate;

pub const TOOL_NAME: &str = "haa-splines";

/// Run settings echoed into the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub x_family: ShapeFamily,
    pub y_family: ShapeFamily,
    pub mode: InterpMode,
    pub resolution: usize,
    pub uncertainty: UncertaintyPolicy,
}

impl From<&AnalysisConfig> for ConfigEcho {
    fn from(c: &AnalysisConfig) -> Self {
        Self {
            x_range: c.x_range,
            y_range: c.y_range,
            x_family: c.x_family,
            y_family: c.y_family,
            mode: c.mode,
            resolution: c.resolution,
            uncertainty: c.uncertainty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub config: ConfigEcho,
    pub templates: Vec<CompositeTemplate>,
}

impl TemplateFile {
    pub fn new(config: &AnalysisConfig, templates: Vec<CompositeTemplate>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Utc::now(),
            config: ConfigEcho::from(config),
            templates,
        }
    }

    /// Look a template up by name (`HToAAH125AX_PP`).
    pub fn find(&self, name: &str) -> Option<&CompositeTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// Write a template JSON file.
pub fn write_template_json(path: &Path, file: &TemplateFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create template JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(2, format!("Failed to write template JSON: {e}")))?;
    Ok(())
}

/// Read a template JSON file.
pub fn read_template_json(path: &Path) -> Result<TemplateFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open template JSON '{}': {e}", path.display())))?;
    let parsed: TemplateFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid template JSON: {e}")))?;
    if parsed.tool != TOOL_NAME {
        return Err(AppError::new(
            2,
            format!("Template JSON was written by '{}', expected '{TOOL_NAME}'.", parsed.tool),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InterpMode, ScanKey};
    use crate::models::template::tests::toy_points;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("haa-splines-{}-{name}", std::process::id()))
    }

    #[test]
    fn templates_reload_and_evaluate_identically() {
        let config = AnalysisConfig { mode: InterpMode::Fit, y_range: [50.0, 200.0], ..AnalysisConfig::default() };
        let key = ScanKey::new("PP", "", 125);
        let template =
            CompositeTemplate::build(&config, &key, &toy_points(&[5.0, 7.0, 9.0, 11.0, 13.0])).unwrap();
        let file = TemplateFile::new(&config, vec![template]);

        let path = temp_path("roundtrip.json");
        write_template_json(&path, &file).unwrap();
        let back = read_template_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.config, file.config);
        let (a, b) = (&file.templates[0], back.find("HToAAH125AX_PP").unwrap());
        for m in [5.0, 6.3, 12.9] {
            let sa = a.shape_at(m).unwrap();
            let sb = b.shape_at(m).unwrap();
            for (va, vb) in sa.x.values.iter().chain(&sa.y.values).zip(sb.x.values.iter().chain(&sb.y.values)) {
                assert!((va - vb).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn foreign_json_is_rejected() {
        let path = temp_path("foreign.json");
        std::fs::write(&path, r#"{"tool":"other-tool","generated_at":"2025-01-01T00:00:00Z","config":{},"templates":[]}"#)
            .unwrap();
        let err = read_template_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);
    }
}

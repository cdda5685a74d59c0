//! Shared "build pipeline" logic used by every command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! scan keys -> grid selection -> per-parameter interpolation -> templates
//!
//! The command handlers can then focus on presentation (printing vs exports).

use tracing::{info, warn};

use crate::domain::{AnalysisConfig, ErrorPolicy, GridTable, ScanKey};
use crate::error::AppError;
use crate::models::CompositeTemplate;

/// A scan key that produced no template, and why.
#[derive(Debug, Clone)]
pub struct SkippedKey {
    pub key: ScanKey,
    pub exit_code: u8,
    pub reason: String,
}

/// All computed outputs of a single build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub templates: Vec<CompositeTemplate>,
    pub skipped: Vec<SkippedKey>,
}

impl BuildOutput {
    pub fn find(&self, name: &str) -> Option<&CompositeTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// Build one template per `(region, shift, h)` in the configured scan.
///
/// With `ErrorPolicy::Abort` the first failing key ends the run; with
/// `ErrorPolicy::Skip` it is recorded and the scan continues.
pub fn run_build(config: &AnalysisConfig, table: &GridTable) -> Result<BuildOutput, AppError> {
    let mut out = BuildOutput::default();

    for key in config.scan_keys() {
        match build_one(config, table, &key) {
            Ok(template) => {
                info!(template = %template.name, masses = template.grid_masses.len(), "template built");
                out.templates.push(template);
            }
            Err(err) => {
                let err = err.context(key.template_name());
                match config.on_error {
                    ErrorPolicy::Abort => return Err(err),
                    ErrorPolicy::Skip => {
                        warn!(%key, "skipping: {}", err.message());
                        out.skipped.push(SkippedKey {
                            key,
                            exit_code: err.exit_code(),
                            reason: err.message().to_string(),
                        });
                    }
                }
            }
        }
    }

    if out.templates.is_empty() {
        let code = out.skipped.first().map_or(3, |s| s.exit_code);
        return Err(AppError::new(code, "No template could be built for any scan key."));
    }
    Ok(out)
}

fn build_one(config: &AnalysisConfig, table: &GridTable, key: &ScanKey) -> Result<CompositeTemplate, AppError> {
    let a_masses = config.a_masses_for(key.h)?;
    let points = table.select(key, &a_masses)?;
    CompositeTemplate::build(config, key, &points)
}

//! Export sampled parameter curves to CSV.
//!
//! One row per `(template, param, mass)`; easy to consume in spreadsheets or
//! plotting scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::models::CompositeTemplate;

pub const CURVES_HEADER: &str = "template,region,shift,h,param,mass,value";

/// Write every curve of every template to a CSV file.
pub fn write_curves_csv(path: &Path, templates: &[CompositeTemplate]) -> Result<usize, AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curves CSV '{}': {e}", path.display())))?;
    write_curves(&mut file, templates)
}

/// Write curves to any writer. Returns the number of data rows.
pub fn write_curves<W: Write>(out: &mut W, templates: &[CompositeTemplate]) -> Result<usize, AppError> {
    writeln!(out, "{CURVES_HEADER}").map_err(|e| AppError::new(2, format!("Failed to write curves CSV header: {e}")))?;

    let mut rows = 0usize;
    for t in templates {
        for (param, curve) in t.curves() {
            for (mass, value) in curve.points() {
                writeln!(
                    out,
                    "{},{},{},{},{},{:.6},{:.10}",
                    t.name, t.key.region, t.key.shift, t.key.h, param, mass, value
                )
                .map_err(|e| AppError::new(2, format!("Failed to write curves CSV row: {e}")))?;
                rows += 1;
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisConfig, InterpMode, ScanKey};
    use crate::models::template::tests::toy_points;

    #[test]
    fn direct_curves_write_one_row_per_grid_mass() {
        let config = AnalysisConfig { mode: InterpMode::Direct, ..AnalysisConfig::default() };
        let key = ScanKey::new("FP", "FakeDown", 300);
        let t = CompositeTemplate::build(&config, &key, &toy_points(&[5.0, 7.0, 9.0])).unwrap();

        let mut buf = Vec::new();
        let rows = write_curves(&mut buf, &[t]).unwrap();
        // 6 parameters + integral, 3 masses each.
        assert_eq!(rows, 21);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CURVES_HEADER));
        assert_eq!(lines.next(), Some("HToAAH300AX_FP_FakeDown,FP,FakeDown,300,xmean,5.000000,5.0000000000"));
    }
}

//! Debug bundle writer for inspecting grid inputs and the curves built from them.

use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::BuildOutput;
use crate::domain::{AnalysisConfig, GridPoint, GridTable};
use crate::error::AppError;
use crate::fit::Interpolator;
use crate::models::CompositeTemplate;
use crate::report::{GridResidual, compute_grid_residuals, format_t_basis};

/// Rows of the sampled-curve table per template.
const CURVE_ROWS: usize = 11;

/// Write the bundle as `haa_debug_<timestamp>.md` under `dir`.
pub fn write_debug_bundle(
    dir: &Path,
    config: &AnalysisConfig,
    table: &GridTable,
    output: &BuildOutput,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("haa_debug_{ts}.md"));

    let text = render_debug_bundle(config, table, output)?;
    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;
    Ok(path)
}

/// Markdown body of the debug bundle.
pub fn render_debug_bundle(config: &AnalysisConfig, table: &GridTable, output: &BuildOutput) -> Result<String, AppError> {
    let mut sections = Vec::with_capacity(output.templates.len());
    for t in &output.templates {
        let used: Vec<GridPoint> = table
            .points(&t.key)
            .iter()
            .filter(|p| t.grid_masses.iter().any(|&m| (m - p.mass).abs() < 1e-9))
            .cloned()
            .collect();
        let residuals = compute_grid_residuals(t, &used)?;
        sections.push(Section { template: t, used, residuals });
    }

    let mut out = String::new();
    write_bundle(&mut out, config, output, &sections)
        .map_err(|e| AppError::new(4, format!("Failed to format debug bundle: {e}")))?;
    Ok(out)
}

struct Section<'a> {
    template: &'a CompositeTemplate,
    used: Vec<GridPoint>,
    residuals: Vec<GridResidual>,
}

fn write_bundle(
    out: &mut String,
    config: &AnalysisConfig,
    output: &BuildOutput,
    sections: &[Section<'_>],
) -> std::fmt::Result {
    writeln!(out, "# haa-splines debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- mode: {:?}", config.mode)?;
    writeln!(out, "- shapes: x={} y={}", config.x_family.code(), config.y_family.code())?;
    writeln!(out, "- resolution: {}", config.resolution)?;
    writeln!(out, "- uncertainty: {:?}", config.uncertainty)?;
    writeln!(out, "- templates: {} built, {} skipped", output.templates.len(), output.skipped.len())?;

    for Section { template: t, used, residuals } in sections {
        writeln!(out, "\n## {}", t.name)?;

        writeln!(out, "\n### Grid")?;
        let keys: Vec<_> = t.params.keys().copied().collect();
        let header: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        writeln!(out, "| a | {} | integral |", header.join(" | "))?;
        writeln!(out, "|{}", " - |".repeat(keys.len() + 2))?;
        for p in used {
            let cells: Vec<String> = keys
                .iter()
                .map(|k| match p.params.get(k) {
                    Some(est) => match est.error {
                        Some(e) => format!("{:.6} ± {e:.6}", est.value),
                        None => format!("{:.6}", est.value),
                    },
                    None => "-".to_string(),
                })
                .collect();
            writeln!(out, "| {} | {} | {} |", p.mass, cells.join(" | "), fmt_opt(p.integral))?;
        }

        writeln!(out, "\n### Fits")?;
        writeln!(out, "| param | strategy | chi2 | ndf | coefficients |")?;
        writeln!(out, "| - | - | - | - | - |")?;
        let interps = t
            .params
            .iter()
            .map(|(k, i)| (k.to_string(), i))
            .chain(t.integral.iter().map(|i| ("integral".to_string(), i)));
        for (name, interp) in interps {
            match interp {
                Interpolator::Direct { grid } => {
                    writeln!(out, "| {name} | direct (n={}) | - | - | - |", grid.len())?;
                }
                Interpolator::Fitted { degree, fit, .. } => {
                    writeln!(
                        out,
                        "| {name} | pol{degree} | {:.4} | {} | {} |",
                        fit.chi2,
                        fit.ndf,
                        format_t_basis(fit)
                    )?;
                }
            }
        }
        if let Some(fit) = &t.integral_fit {
            writeln!(
                out,
                "| integral (display) | pol{} | {:.4} | {} | {} |",
                fit.degree(),
                fit.chi2,
                fit.ndf,
                format_t_basis(fit)
            )?;
        }

        writeln!(out, "\n### Residuals")?;
        writeln!(out, "| param | a | value | curve | pull |")?;
        writeln!(out, "| - | - | - | - | - |")?;
        for r in residuals {
            writeln!(
                out,
                "| {} | {} | {:.6} | {:.6} | {} |",
                r.param,
                r.mass,
                r.value,
                r.fitted,
                fmt_opt(r.pull)
            )?;
        }

        writeln!(out, "\n### Curve samples")?;
        let curves = t.curves();
        let names: Vec<&str> = curves.iter().map(|(n, _)| n.as_str()).collect();
        writeln!(out, "| a | {} |", names.join(" | "))?;
        writeln!(out, "|{}", " - |".repeat(names.len() + 1))?;
        if let Some((_, first)) = curves.first() {
            let n = first.len();
            let step = (n / (CURVE_ROWS - 1)).max(1);
            let rows = (0..n).step_by(step).chain((n > 0 && (n - 1) % step != 0).then_some(n - 1));
            for i in rows {
                let cells: Vec<String> = curves.iter().map(|(_, c)| fmt_opt(c.values.get(i).copied())).collect();
                writeln!(out, "| {:.3} | {} |", first.masses[i], cells.join(" | "))?;
            }
        }
    }

    if !output.skipped.is_empty() {
        writeln!(out, "\n## Skipped")?;
        for s in &output.skipped {
            writeln!(out, "- {} (exit {}): {}", s.key, s.exit_code, s.reason)?;
        }
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => "-".to_string(),
    }
}

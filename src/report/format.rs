//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the interpolation code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::app::pipeline::BuildOutput;
use crate::domain::{AnalysisConfig, InterpMode, UncertaintyPolicy};
use crate::fit::{Interpolator, PolyFit};
use crate::models::{CompositeTemplate, ShapeParams, TemplateShape};
use crate::report::GridResidual;

/// Format the full build summary (run settings + per-template diagnostics).
pub fn format_build_summary(output: &BuildOutput, config: &AnalysisConfig) -> String {
    let mut out = String::new();

    out.push_str("=== haa-splines - signal mass splines ===\n");
    out.push_str(&format!(
        "Shapes: x={} | y={}\n",
        config.x_family.display_name(),
        config.y_family.display_name()
    ));
    out.push_str(&format!("Mode: {}\n", mode_label(config)));
    out.push_str(&format!(
        "Ranges: x=[{}, {}] | y=[{}, {}]\n",
        config.x_range[0], config.x_range[1], config.y_range[0], config.y_range[1]
    ));
    out.push_str(&format!(
        "Templates: built={} skipped={}\n",
        output.templates.len(),
        output.skipped.len()
    ));

    for t in &output.templates {
        out.push('\n');
        out.push_str(&format_template(t));
    }

    if !output.skipped.is_empty() {
        out.push_str("\nSkipped:\n");
        for s in &output.skipped {
            out.push_str(&format!("  {} (exit {}): {}\n", s.key, s.exit_code, s.reason));
        }
    }

    out
}

fn mode_label(config: &AnalysisConfig) -> String {
    match config.mode {
        InterpMode::Direct => "direct (grid values)".to_string(),
        InterpMode::Fit => {
            let weights = match config.uncertainty {
                UncertaintyPolicy::Floor { min_sigma } => format!("floor sigma>={min_sigma:e}"),
                UncertaintyPolicy::Skip => "skip unusable sigma".to_string(),
                UncertaintyPolicy::Unweighted => "unweighted".to_string(),
            };
            format!("fit (resolution={}, {weights})", config.resolution)
        }
    }
}

/// One template block: masses, then one line per parameter.
///
/// Fitted coefficients are printed in the normalized variable
/// `t = (a - shift) / scale` they were fitted in.
pub fn format_template(t: &CompositeTemplate) -> String {
    let mut out = String::new();
    let masses: Vec<String> = t.grid_masses.iter().map(|m| format!("{m}")).collect();
    out.push_str(&format!("{} [{}]\n", t.name, t.key));
    out.push_str(&format!("  a = {}\n", masses.join(", ")));

    for (key, interp) in &t.params {
        let label = key.to_string();
        out.push_str(&format_interp_line(&label, interp));
    }
    if let Some(interp) = &t.integral {
        out.push_str(&format_interp_line("integral", interp));
    }
    if let Some(fit) = &t.integral_fit {
        out.push_str(&format_fit_line("(display)", fit.degree(), fit));
    }
    out
}

fn format_interp_line(label: &str, interp: &Interpolator) -> String {
    match interp {
        Interpolator::Direct { grid } => format!("  {label:<10} direct  n={}\n", grid.len()),
        Interpolator::Fitted { degree, fit, .. } => format_fit_line(label, *degree, fit),
    }
}

fn format_fit_line(label: &str, degree: usize, fit: &PolyFit) -> String {
    let chi2_ndf = if fit.ndf > 0 {
        format!("{:.3}", fit.chi2 / fit.ndf as f64)
    } else {
        "-".to_string()
    };
    format!("  {label:<10} pol{degree}    chi2/ndf={chi2_ndf:<8} {}\n", format_t_basis(fit))
}

/// Coefficients with the mass normalization they apply to.
pub fn format_t_basis(fit: &PolyFit) -> String {
    format!(
        "coeffs(t)={} t=(a-{:.4})/{:.4}",
        fmt_vec(&fit.coefficients),
        fit.shift,
        fit.scale
    )
}

/// Evaluated shape at one mass.
pub fn format_shape(template: &CompositeTemplate, shape: &TemplateShape) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} at a={}\n", template.name, shape.mass));
    out.push_str(&format_params("x", &shape.x));
    out.push_str(&format_params("y", &shape.y));
    if let Some(i) = shape.integral {
        out.push_str(&format!("  integral = {i:.6}\n"));
    }
    out
}

fn format_params(axis: &str, p: &ShapeParams) -> String {
    let parts: Vec<String> = p
        .family
        .params()
        .iter()
        .zip(&p.values)
        .map(|(name, v)| format!("{}={v:.6}", name.as_str()))
        .collect();
    format!("  {axis} {:<3} {}\n", p.family.code(), parts.join(" "))
}

/// Table of the largest grid pulls.
pub fn format_pulls(rows: &[GridResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>8} {:>14} {:>14} {:>10}", "param", "a", "value", "curve", "pull"));
    out.push('\n');
    out.push_str(&format!("{:-<10} {:-<8} {:-<14} {:-<14} {:-<10}", "", "", "", "", ""));
    out.push('\n');
    for r in rows {
        let pull = r.pull.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<10} {:>8} {:>14.6} {:>14.6} {:>10}",
            r.param.to_string(),
            r.mass,
            r.value,
            r.fitted,
            pull
        ));
        out.push('\n');
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::SkippedKey;
    use crate::domain::ScanKey;
    use crate::models::template::tests::toy_points;

    fn output(mode: InterpMode) -> (BuildOutput, AnalysisConfig) {
        let config = AnalysisConfig { mode, y_range: [50.0, 200.0], ..AnalysisConfig::default() };
        let t = CompositeTemplate::build(&config, &ScanKey::new("PP", "", 125), &toy_points(&[5.0, 7.0, 9.0, 11.0]))
            .unwrap();
        let out = BuildOutput {
            templates: vec![t],
            skipped: vec![SkippedKey {
                key: ScanKey::new("FP", "", 750),
                exit_code: 3,
                reason: "No grid data".to_string(),
            }],
        };
        (out, config)
    }

    #[test]
    fn summary_lists_templates_and_skips() {
        let (out, config) = output(InterpMode::Direct);
        let text = format_build_summary(&out, &config);
        assert!(text.contains("Templates: built=1 skipped=1"));
        assert!(text.contains("HToAAH125AX_PP [region=PP shift=central h=125]"));
        assert!(text.contains("  xmean      direct  n=4"));
        assert!(text.contains("region=FP shift=central h=750 (exit 3): No grid data"));
    }

    #[test]
    fn fit_summary_shows_degrees() {
        let (out, config) = output(InterpMode::Fit);
        let text = format_build_summary(&out, &config);
        assert!(text.contains("Mode: fit (resolution=100"));
        assert!(text.contains("  xmean      pol1"));
        assert!(text.contains("  ysigma2    pol2"));
        assert!(text.contains("  integral   direct  n=4"));
        assert!(text.contains("  (display)  pol2"));
    }

    #[test]
    fn fitted_lines_use_stored_degree_and_t_basis() {
        let (mut out, _) = output(InterpMode::Fit);
        // A degree override that the summary's config knows nothing about.
        let t = &mut out.templates[0];
        let samples = t.grid_samples("xmean").unwrap();
        let key = "xmean".parse().unwrap();
        t.params.insert(key, Interpolator::fitted(&samples, 3, UncertaintyPolicy::Unweighted).unwrap());

        let text = format_template(t);
        let line = text.lines().find(|l| l.starts_with("  xmean ")).unwrap();
        assert!(line.contains("pol3"), "{line}");
        assert!(line.contains("coeffs(t)=["));
        assert!(line.contains("t=(a-8.0000)/3.0000"), "{line}");
    }

    #[test]
    fn shape_lists_declared_parameters() {
        let (out, _) = output(InterpMode::Direct);
        let t = &out.templates[0];
        let text = format_shape(t, &t.shape_at(7.0).unwrap());
        assert!(text.starts_with("HToAAH125AX_PP at a=7\n"));
        assert!(text.contains("  x V   mean=7.000000 width=0.070000"));
        assert!(text.contains("  y DG  mean=120.700000"));
        assert!(text.contains("integral = 114.000000"));
    }
}

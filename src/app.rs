//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - resolves the analysis configuration (file, environment, CLI overrides)
//! - ingests the grid and builds templates
//! - prints reports/plots
//! - writes optional exports

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cli::{BuildArgs, Command, ConfigArgs, EvalArgs, PlotArgs, ToyArgs};
use crate::domain::{AnalysisConfig, DEFAULT_MIN_SIGMA, InterpMode, ParamKey, UncertaintyMode, UncertaintyPolicy};
use crate::error::AppError;
use crate::models::CompositeTemplate;
use crate::plot::{PULL_ALERT, PlotPoint};

pub mod pipeline;

/// Environment variable naming a default config file.
pub const CONFIG_ENV: &str = "HAA_SPLINES_CONFIG";

/// Dispatch a parsed command.
pub fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Build(args) => handle_build(args),
        Command::Eval(args) => handle_eval(args),
        Command::Plot(args) => handle_plot(args),
        Command::Toy(args) => handle_toy(args),
    }
}

fn handle_build(args: BuildArgs) -> Result<(), AppError> {
    let config = load_config(&args.config)?;
    let ingest = crate::io::load_grid_csv(&args.grid)?;
    info!(
        rows_read = ingest.rows_read,
        rows_used = ingest.rows_used,
        rows_skipped = ingest.row_errors.len(),
        keys = ingest.table.len(),
        "grid ingested"
    );

    let output = pipeline::run_build(&config, &ingest.table)?;

    if args.quiet {
        println!(
            "built {} template(s), skipped {}",
            output.templates.len(),
            output.skipped.len()
        );
    } else {
        println!("{}", crate::report::format_build_summary(&output, &config));
        if args.top > 0 && config.mode == InterpMode::Fit {
            print_worst_pulls(&output, &ingest.table, args.top)?;
        }
    }

    if let Some(path) = &args.export {
        let file = crate::io::TemplateFile::new(&config, output.templates.clone());
        crate::io::write_template_json(path, &file)?;
        info!(path = %path.display(), templates = file.templates.len(), "templates written");
    }
    if let Some(path) = &args.export_curves {
        let rows = crate::io::write_curves_csv(path, &output.templates)?;
        info!(path = %path.display(), rows, "curves written");
    }
    if let Some(dir) = &args.debug_dir {
        let path = crate::debug::write_debug_bundle(dir, &config, &ingest.table, &output)?;
        info!(path = %path.display(), "debug bundle written");
    }

    Ok(())
}

fn print_worst_pulls(
    output: &pipeline::BuildOutput,
    table: &crate::domain::GridTable,
    top: usize,
) -> Result<(), AppError> {
    let mut residuals = Vec::new();
    for t in &output.templates {
        let points = table.select(&t.key, &t.grid_masses)?;
        residuals.extend(crate::report::compute_grid_residuals(t, &points)?);
    }
    let worst = crate::report::worst_pulls(&residuals, top);
    if !worst.is_empty() {
        println!("Largest pulls:");
        println!("{}", crate::report::format_pulls(&worst));
    }
    Ok(())
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let file = crate::io::read_template_json(&args.templates)?;
    let template = file
        .find(&args.name)
        .ok_or_else(|| AppError::new(2, format!("No template named '{}' in {}.", args.name, args.templates.display())))?;

    let shape = template.shape_at(args.mass)?;
    println!("{}", crate::report::format_shape(template, &shape));

    if let Some(at) = &args.at {
        // clap enforces exactly two values.
        let (x, y) = (at[0], at[1]);
        let density = template.density_at(args.mass, x, y)?;
        println!("density(x={x}, y={y}) = {density:.6e}");
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_template_json(&args.templates)?;
    let template = file
        .find(&args.name)
        .ok_or_else(|| AppError::new(2, format!("No template named '{}' in {}.", args.name, args.templates.display())))?;

    let curve = template.curve(&args.param).ok_or_else(|| {
        let known: Vec<String> = template.curves().into_iter().map(|(n, _)| n).collect();
        AppError::new(2, format!("Unknown parameter '{}'; expected one of: {}.", args.param, known.join(", ")))
    })?;

    let points = plot_points(template, &args.param)?;
    let label = format!("{} {}", template.name, args.param);
    let plot = crate::plot::render_parameter_plot(&label, &curve, &points, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Grid values of one curve, flagged when their pull exceeds `PULL_ALERT`.
fn plot_points(template: &CompositeTemplate, name: &str) -> Result<Vec<PlotPoint>, AppError> {
    match name.parse::<ParamKey>() {
        Ok(key) => Ok(crate::report::stored_grid_residuals(template, key)?
            .into_iter()
            .map(|r| PlotPoint {
                mass: r.mass,
                value: r.value,
                flagged: r.pull.is_some_and(|p| p.abs() > PULL_ALERT),
            })
            .collect()),
        // Yields carry no uncertainty and are never flagged.
        Err(_) => Ok(template
            .grid_samples(name)
            .unwrap_or_default()
            .into_iter()
            .map(|s| PlotPoint { mass: s.mass, value: s.value, flagged: false })
            .collect()),
    }
}

fn handle_toy(args: ToyArgs) -> Result<(), AppError> {
    let config = load_config(&args.config)?;
    let opts = crate::data::ToyOptions { seed: args.seed, noise: args.noise };
    let records = crate::data::generate_toy_grid(&config, opts)?;
    crate::data::write_grid_csv(&args.out, &records)?;
    println!("wrote {} rows to {}", records.len(), args.out.display());
    Ok(())
}

/// Resolve the run configuration: `--config`, else `$HAA_SPLINES_CONFIG`, else
/// defaults; then apply CLI overrides and validate.
pub fn load_config(args: &ConfigArgs) -> Result<AnalysisConfig, AppError> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let base = match &path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            read_config_json(p)?
        }
        None => AnalysisConfig::default(),
    };

    let config = apply_overrides(base, args);
    config.validate()?;
    Ok(config)
}

fn read_config_json(path: &Path) -> Result<AnalysisConfig, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))
}

pub fn apply_overrides(mut config: AnalysisConfig, args: &ConfigArgs) -> AnalysisConfig {
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(family) = args.y_family {
        config.y_family = family;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(policy) = args.on_error {
        config.on_error = policy;
    }

    let current_floor = match config.uncertainty {
        UncertaintyPolicy::Floor { min_sigma } => min_sigma,
        _ => DEFAULT_MIN_SIGMA,
    };
    let min_sigma = args.min_sigma.unwrap_or(current_floor);
    match args.uncertainty {
        Some(mode) => config.uncertainty = mode.to_policy(min_sigma),
        None if args.min_sigma.is_some() => config.uncertainty = UncertaintyMode::Floor.to_policy(min_sigma),
        None => {}
    }
    config
}

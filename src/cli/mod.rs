//! Command-line parsing for the mass-spline builder.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the interpolation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ErrorPolicy, InterpMode, ShapeFamily, UncertaintyMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "haa-splines", version, about = "Signal mass splines for h -> aa shape fits")]
pub struct Cli {
    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build templates from a grid CSV, print diagnostics and optionally export.
    Build(BuildArgs),
    /// Evaluate a saved template at one light mass.
    Eval(EvalArgs),
    /// Plot one parameter curve of a saved template.
    Plot(PlotArgs),
    /// Write a toy grid CSV for dry runs.
    Toy(ToyArgs),
}

/// Run-level overrides applied on top of the config file.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// Analysis config JSON (defaults to `$HAA_SPLINES_CONFIG`, then built-in defaults).
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Interpolation mode.
    #[arg(long, value_enum)]
    pub mode: Option<InterpMode>,

    /// Shape family of the y observable.
    #[arg(long = "y-family", value_enum)]
    pub y_family: Option<ShapeFamily>,

    /// Number of intervals in the dense mass partition.
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Treatment of zero or missing uncertainties in fit mode.
    #[arg(long, value_enum)]
    pub uncertainty: Option<UncertaintyMode>,

    /// Uncertainty floor used with `--uncertainty floor`.
    #[arg(long)]
    pub min_sigma: Option<f64>,

    /// What to do when one scan key fails.
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<ErrorPolicy>,
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    /// Grid CSV with columns region,shift,h,a,param,value,error.
    #[arg(long, value_name = "CSV")]
    pub grid: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write templates to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Write sampled curves to CSV.
    #[arg(long = "export-curves", value_name = "CSV")]
    pub export_curves: Option<PathBuf>,

    /// Write a Markdown debug bundle into this directory.
    #[arg(long = "debug-dir", value_name = "DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Show the N largest grid pulls (fit mode).
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Only print the summary line.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Template JSON produced by `haa-splines build --export`.
    #[arg(long, value_name = "JSON")]
    pub templates: PathBuf,

    /// Template name, e.g. HToAAH125AX_PP.
    #[arg(long)]
    pub name: String,

    /// Light mass to evaluate at.
    #[arg(long)]
    pub mass: f64,

    /// Also print the normalized density at this (x, y).
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    pub at: Option<Vec<f64>>,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Template JSON produced by `haa-splines build --export`.
    #[arg(long, value_name = "JSON")]
    pub templates: PathBuf,

    /// Template name, e.g. HToAAH125AX_PP.
    #[arg(long)]
    pub name: String,

    /// Parameter to plot (xmean, ysigma1, integral, ...).
    #[arg(long)]
    pub param: String,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ToyArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Relative Gaussian jitter on every value.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    #[command(flatten)]
    pub config: ConfigArgs,
}

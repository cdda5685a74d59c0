//! `haa-splines` library crate.
//!
//! Turns per-mass signal shape fits into continuous templates over the light
//! mass. The binary (`haa-splines`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - templates can be built and evaluated from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

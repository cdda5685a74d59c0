//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - shape vocabulary (`Axis`, `ShapeParam`, `ShapeFamily`, `ParamKey`)
//! - grid inputs (`GridPoint`, `GridSample`, `Estimate`, `GridTable`)
//! - the immutable run configuration (`AnalysisConfig`, `ScanKey`, policies)

pub mod grid;
pub mod types;

pub use grid::*;
pub use types::*;

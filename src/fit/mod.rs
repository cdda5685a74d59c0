//! Grid interpolation.
//!
//! Responsibilities:
//!
//! - validate the discrete mass grid and build the shared dense partition
//! - weighted polynomial regression of one parameter across the grid
//! - the direct/fitted interpolation strategy
//! - per-parameter degree choice

pub mod interpolator;
pub mod mass_grid;
pub mod plan;
pub mod polyfit;

pub use interpolator::*;
pub use mass_grid::*;
pub use plan::*;
pub use polyfit::*;

//! Mathematical utilities: polynomial basis, weighted least squares, quadrature.

pub mod basis;
pub mod ols;
pub mod quad;

pub use basis::*;
pub use ols::*;
pub use quad::*;

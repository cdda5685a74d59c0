//! Input/output helpers.
//!
//! - grid CSV ingest + validation (`ingest`)
//! - template JSON read/write (`spline`)
//! - curve CSV exports (`export`)

pub mod export;
pub mod ingest;
pub mod spline;

pub use export::*;
pub use ingest::*;
pub use spline::*;

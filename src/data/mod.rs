//! Synthetic inputs.

pub mod toy;

pub use toy::*;

//! Shape families and composite templates.
//!
//! Shapes are evaluated by small, pure functions so that the template code can
//! stay generic over the family.

pub mod model;
pub mod template;

pub use model::*;
pub use template::*;

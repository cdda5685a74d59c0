//! Error types.
//!
//! - [`InterpError`]: input-validation and solve failures raised while turning a
//!   mass grid into a parameter curve. Each one aborts the curve it was raised for.
//! - [`AppError`]: what the binary reports, carrying a process exit code.
//!
//! Exit codes: `2` bad input/config/IO, `3` insufficient data, `4` computation failure.

use thiserror::Error;

/// Failure while building or querying a parameter interpolation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    /// Fewer grid points than the requested polynomial degree needs.
    #[error("insufficient grid points: degree {degree} needs {needed}, got {found}")]
    InsufficientGridPoints {
        degree: usize,
        needed: usize,
        found: usize,
    },

    /// Direct lookup at a mass that is not on the grid.
    #[error("mass {mass} is not a grid mass")]
    UnknownQueryMass { mass: f64 },

    /// Grid masses are not strictly increasing once sorted (repeated mass).
    #[error("grid masses are not strictly increasing: {0}")]
    NonMonotonicGrid(String),

    /// No usable weight: every uncertainty is zero, missing or non-finite.
    #[error("all weights are zero or non-finite; weighted regression is ill-posed")]
    DegenerateUncertainty,

    /// A grid mass or value is NaN/infinite.
    #[error("non-finite grid entry at mass {mass}")]
    NonFiniteValue { mass: f64 },

    /// The least-squares system could not be solved to a finite solution.
    #[error("least-squares solve failed for degree {degree}")]
    SolveFailed { degree: usize },
}

impl InterpError {
    /// Exit code used when the error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            InterpError::NonMonotonicGrid(_)
            | InterpError::NonFiniteValue { .. }
            | InterpError::UnknownQueryMass { .. } => 2,
            InterpError::InsufficientGridPoints { .. } | InterpError::DegenerateUncertainty => 3,
            InterpError::SolveFailed { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with context (e.g. which parameter or scan point failed).
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl From<InterpError> for AppError {
    fn from(err: InterpError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_errors_map_to_exit_codes() {
        let e: AppError = InterpError::UnknownQueryMass { mass: 4.5 }.into();
        assert_eq!(e.exit_code(), 2);
        assert!(e.message().contains("4.5"));

        let e: AppError = InterpError::InsufficientGridPoints { degree: 2, needed: 3, found: 2 }.into();
        assert_eq!(e.exit_code(), 3);

        let e: AppError = InterpError::SolveFailed { degree: 1 }.into();
        assert_eq!(e.exit_code(), 4);
    }

    #[test]
    fn context_prefixes_message() {
        let e = AppError::new(3, "boom").context("ysigma");
        assert_eq!(e.to_string(), "ysigma: boom");
        assert_eq!(e.exit_code(), 3);
    }
}

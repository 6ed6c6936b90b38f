//! Error types for registration operations.

use bonereg_core::ImageError;
use thiserror::Error;
use crate::optimizer::OptimizerDiagnostics;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Invalid input image, mask or geometry.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Invalid registration configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The metric or the optimiser produced a non-finite value. Terminal for
    /// the current estimation; no transform is returned.
    #[error("Numerical failure: {message} ({diagnostics})")]
    NumericalFailure {
        message: String,
        diagnostics: OptimizerDiagnostics,
    },
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a numerical failure error.
    pub fn numerical_failure(msg: impl Into<String>, diagnostics: OptimizerDiagnostics) -> Self {
        Self::NumericalFailure {
            message: msg.into(),
            diagnostics,
        }
    }

    /// True for errors caused by invalid inputs rather than the optimisation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Image(_) | Self::InvalidConfiguration(_))
    }
}

//! Error types for signal construction.

use thiserror::Error;

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors raised while building a signal from raw breakpoints.
///
/// Algebraic operations between valid signals never fail; only the
/// constructors validate their input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("Non-finite breakpoint key: {0}")]
    NonFiniteKey(f64),

    #[error("Non-finite level at breakpoint {0}")]
    NonFiniteLevel(f64),

    #[error("Duplicate breakpoint key: {0}")]
    DuplicateKey(f64),

    #[error("Invalid segment [{start}, {end}): end must be greater than start")]
    InvalidSegment { start: f64, end: f64 },

    #[error("Invalid bounding box: {0}")]
    InvalidBox(String),
}

impl SignalError {
    /// Create an invalid bounding box error.
    pub fn invalid_box(message: impl Into<String>) -> Self {
        Self::InvalidBox(message.into())
    }
}

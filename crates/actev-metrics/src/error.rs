//! Error types for metric computation.

use actev_models::ModelError;
use thiserror::Error;

/// Result type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised while computing metrics.
///
/// Zero denominators are not errors; they surface as `None` values and
/// rejected counts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("Invalid metric parameter: {0}")]
    InvalidParameter(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl MetricsError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

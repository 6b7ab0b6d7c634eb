//! Error types for kernels and alignment.

use actev_metrics::MetricsError;
use actev_models::ModelError;
use thiserror::Error;

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;

/// Errors raised while building kernels or evaluating pairs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("No weight configured for component: {0}")]
    MissingWeight(String),

    #[error("Invalid kernel parameter: {0}")]
    InvalidParameter(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

impl AlignError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

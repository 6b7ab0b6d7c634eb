//! Scorer error types.

use actev_align::AlignError;
use actev_metrics::MetricsError;
use actev_models::ModelError;
use thiserror::Error;

pub type ScorerResult<T> = Result<T, ScorerError>;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Invalid scoring parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Alignment error: {0}")]
    Align(#[from] AlignError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScorerError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn unknown_protocol(msg: impl Into<String>) -> Self {
        Self::UnknownProtocol(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

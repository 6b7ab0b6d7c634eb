//! Error types for model construction.

use actev_signal::SignalError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building instances or looking up files.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Instance {instance} has no localization")]
    EmptyLocalization { instance: String },

    #[error("Instance {instance} has zero duration in file {file}")]
    ZeroDuration { instance: String, file: String },

    #[error("Instance {instance} has a non-finite localization in file {file}")]
    NonFiniteLocalization { instance: String, file: String },

    #[error("Instance {instance} has invalid presence confidence {value}")]
    InvalidConfidence { instance: String, value: f64 },

    #[error("Instance {instance} is missing a presence confidence")]
    MissingConfidence { instance: String },

    #[error("File not found in file index: {0}")]
    UnknownFile(String),

    #[error("Invalid framerate {framerate} for file {file}")]
    InvalidFramerate { file: String, framerate: f64 },

    #[error("Invalid alignment kind: {0}")]
    InvalidKind(String),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),
}

impl ModelError {
    pub fn empty_localization(instance: impl Into<String>) -> Self {
        Self::EmptyLocalization {
            instance: instance.into(),
        }
    }

    pub fn zero_duration(instance: impl Into<String>, file: impl Into<String>) -> Self {
        Self::ZeroDuration {
            instance: instance.into(),
            file: file.into(),
        }
    }

    pub fn non_finite_localization(instance: impl Into<String>, file: impl Into<String>) -> Self {
        Self::NonFiniteLocalization {
            instance: instance.into(),
            file: file.into(),
        }
    }

    pub fn missing_confidence(instance: impl Into<String>) -> Self {
        Self::MissingConfidence {
            instance: instance.into(),
        }
    }

    pub fn unknown_file(file: impl Into<String>) -> Self {
        Self::UnknownFile(file.into())
    }
}

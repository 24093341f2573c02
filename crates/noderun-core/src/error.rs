//! Core domain errors.

use thiserror::Error;

/// Core domain errors for noderun.
///
/// Every variant is raised synchronously while building or validating a
/// value. A failed execution is recorded on the run itself (`error` and
/// `error_message`) and never surfaces through this type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A storage URI could not be parsed.
    #[error("Invalid storage URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Structured options were supplied for a backend that cannot honour them.
    #[error("Options '{options}' are not supported by the '{backend}' backend")]
    UnsupportedBackend { options: String, backend: String },

    /// Missing, malformed or non-matching signature.
    #[error("Signature error: {0}")]
    Signature(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a [`CoreError::Signature`] error.
    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

//! Error types for noderun-storage

use noderun_core::storage::StorageType;
use noderun_core::CoreError;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised while executing a storage request.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The request itself was invalid.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Nothing stored at the requested location.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No backend registered for the request's storage type.
    #[error("No backend configured for storage type '{0}'")]
    BackendNotConfigured(StorageType),

    /// The backend could not carry out the operation.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

//! Error types for noderun-node

use noderun_core::{ConsumerId, CoreError, RunId};
use thiserror::Error;

/// Result type for node operations
pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// Errors returned by a node when submitting or querying runs.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Validation, signature or lifecycle error from the domain model.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// No handler is registered for the deployment's module.
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// The consumer has no registered public key on this node.
    #[error("Unknown consumer: {0}")]
    UnknownConsumer(ConsumerId),

    #[error("Node at capacity ({limit} active runs)")]
    AtCapacity { limit: usize },

    /// A module failed while executing.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl NodeError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
}

//! noderun core domain types
//!
//! Pure data model shared by the storage and node crates:
//! - Deployments and the nodes they target
//! - Run inputs, runs and the run lifecycle
//! - Consumer signatures
//! - Storage locations and requests
//!
//! Nothing here does I/O.

pub mod config;
pub mod deployment;
pub mod error;
pub mod ids;
pub mod module;
pub mod node;
pub mod run;
pub mod signing;
pub mod status;
pub mod storage;
pub mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{ConsumerId, NodeId, RunId};
pub use module::{Module, ModuleType};
pub use node::{NodeConfig, NodeConfigUser, NodeResolver, NodeTarget, ServerType};
pub use run::{Run, RunRecord, RunRequest, RunState, RunTable};
pub use signing::{sign_consumer_id, verify_consumer_signature, ConsumerKey};
pub use status::{ComponentKind, RunStatus};
pub use wire::{from_wire, WireForm};

//! noderun node
//!
//! The boundary to nodes that execute runs ([`NodeClient`]) and an
//! in-process implementation of it ([`LocalNode`]).

pub mod client;
pub mod config;
pub mod error;
pub mod local;

pub use client::NodeClient;
pub use config::NodeSettings;
pub use error::{NodeError, NodeResult};
pub use local::{FnHandler, LocalNode, ModuleHandler};

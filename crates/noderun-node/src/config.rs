//! Node configuration.

use noderun_core::{NodeConfig, NodeId};
use serde::{Deserialize, Serialize};

/// Settings of an in-process node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Descriptor this node advertises; deployments must resolve to it.
    pub node: NodeConfig,

    /// Maximum number of runs that may be pending or processing at once.
    pub max_concurrent_runs: usize,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            node: NodeConfig::new(NodeId::generate(), "local", "localhost", 7001),
            max_concurrent_runs: 10,
        }
    }
}

impl NodeSettings {
    pub fn new(node: NodeConfig) -> Self {
        Self {
            node,
            ..Default::default()
        }
    }

    /// Builder method to set the concurrency limit.
    pub fn with_max_concurrent_runs(mut self, limit: usize) -> Self {
        self.max_concurrent_runs = limit;
        self
    }
}

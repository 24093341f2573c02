//! Node descriptors and deployment targets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, NodeId};

/// Server protocol a node exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Http,
    Ws,
    Grpc,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Ws => "ws",
            Self::Grpc => "grpc",
        })
    }
}

/// One server endpoint a node runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeServer {
    pub server_type: ServerType,
    pub port: u16,
    pub node_id: NodeId,
}

/// Fully resolved description of a node, as registered with the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: NodeId,
    pub owner: String,
    /// Hex-encoded public key of the node operator.
    pub public_key: String,
    pub ip: String,
    pub http_port: u16,
    pub server_type: ServerType,
    /// Server types the node runs, by wire name.
    pub servers: Vec<String>,
    /// Models the node can serve.
    pub models: Vec<String>,
    /// Whether the node accepts docker jobs.
    pub docker_jobs: bool,
    pub ports: Vec<u16>,
}

impl NodeConfig {
    /// Create a node descriptor with no servers, models or extra ports.
    pub fn new(
        id: impl Into<NodeId>,
        owner: impl Into<String>,
        ip: impl Into<String>,
        http_port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            public_key: String::new(),
            ip: ip.into(),
            http_port,
            server_type: ServerType::Http,
            servers: Vec::new(),
            models: Vec::new(),
            docker_jobs: false,
            ports: vec![http_port],
        }
    }

    /// Builder method to set the public key.
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = key.into();
        self
    }

    /// Builder method to set the server type.
    pub fn with_server_type(mut self, server_type: ServerType) -> Self {
        self.server_type = server_type;
        self
    }

    /// Builder method to record a server the node runs.
    pub fn with_server(mut self, server: &NodeServer) -> Self {
        let name = server.server_type.to_string();
        if !self.servers.contains(&name) {
            self.servers.push(name);
        }
        if !self.ports.contains(&server.port) {
            self.ports.push(server.port);
        }
        self
    }

    /// Builder method to add a served model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models.push(model.into());
        self
    }

    /// Base URL for the node's HTTP endpoint.
    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.http_port)
    }

    /// Check if this node serves a given model.
    pub fn supports_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

/// A user-supplied node address, resolved against the hub later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfigUser {
    pub ip: String,
    pub http_port: Option<u16>,
    pub server_type: Option<ServerType>,
}

impl NodeConfigUser {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            http_port: None,
            server_type: None,
        }
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.http_port = Some(port);
        self
    }

    /// Whether `node` is a plausible resolution of this address.
    pub fn matches(&self, node: &NodeConfig) -> bool {
        self.ip == node.ip
            && self.http_port.map_or(true, |p| p == node.http_port)
            && self.server_type.map_or(true, |s| s == node.server_type)
    }
}

/// Where a deployment runs.
///
/// The resolved form is tried first when deserialising, so a payload with
/// the full set of node fields always lands in [`NodeTarget::Resolved`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeTarget {
    Resolved(NodeConfig),
    UserSupplied(NodeConfigUser),
}

impl NodeTarget {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&NodeConfig> {
        match self {
            Self::Resolved(node) => Some(node),
            Self::UserSupplied(_) => None,
        }
    }

    pub fn ip(&self) -> &str {
        match self {
            Self::Resolved(node) => &node.ip,
            Self::UserSupplied(user) => &user.ip,
        }
    }

    /// Replace a user-supplied address with the node it resolves to.
    /// Already-resolved targets are left untouched.
    pub fn resolve_with<R: NodeResolver + ?Sized>(
        &mut self,
        resolver: &R,
    ) -> Result<(), CoreError> {
        if let Self::UserSupplied(user) = self {
            let node = resolver.resolve(user)?;
            *self = Self::Resolved(node);
        }
        Ok(())
    }
}

impl From<NodeConfig> for NodeTarget {
    fn from(node: NodeConfig) -> Self {
        Self::Resolved(node)
    }
}

impl From<NodeConfigUser> for NodeTarget {
    fn from(user: NodeConfigUser) -> Self {
        Self::UserSupplied(user)
    }
}

/// Looks up the full node descriptor behind a user-supplied address.
pub trait NodeResolver {
    fn resolve(&self, target: &NodeConfigUser) -> Result<NodeConfig, CoreError>;
}

/// Resolve against a fixed list of known nodes.
impl NodeResolver for [NodeConfig] {
    fn resolve(&self, target: &NodeConfigUser) -> Result<NodeConfig, CoreError> {
        self.iter()
            .find(|node| target.matches(node))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("node at {}", target.ip)))
    }
}

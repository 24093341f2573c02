//! Deployments: where a component runs and what it runs.
//!
//! Agent and orchestrator deployments own their sub-deployments by value.
//! Building one never touches the sub-deployments' nodes; each is resolved
//! on its own and may target a different node than its parent.

use serde::{Deserialize, Serialize};

use crate::config::{
    AgentConfig, DataGenerationConfig, EnvironmentConfig, KbConfig, OrchestratorConfig,
    ToolConfig,
};
use crate::node::{NodeResolver, NodeTarget};
use crate::{ComponentKind, CoreError, Module, WireForm};

/// Behaviour shared by every deployment kind.
pub trait Deployment {
    /// Component kind this deployment targets.
    const KIND: ComponentKind;

    fn node(&self) -> &NodeTarget;

    fn node_mut(&mut self) -> &mut NodeTarget;

    fn module(&self) -> Option<&Module>;

    fn name(&self) -> Option<&str>;

    /// Check that the deployment can be submitted: a resolved node and a
    /// non-empty module. Sub-deployments are not inspected.
    fn validate_for_submission(&self) -> Result<(), CoreError> {
        if !self.node().is_resolved() {
            return Err(CoreError::validation(format!(
                "{} deployment targets unresolved node '{}'",
                Self::KIND,
                self.node().ip()
            )));
        }
        match self.module() {
            Some(module) if !module.is_empty() => Ok(()),
            _ => Err(CoreError::validation(format!(
                "{} deployment has no module",
                Self::KIND
            ))),
        }
    }

    /// Resolve this deployment's own node.
    fn resolve_node<R: NodeResolver + ?Sized>(&mut self, resolver: &R) -> Result<(), CoreError> {
        self.node_mut().resolve_with(resolver)
    }
}

macro_rules! impl_deployment {
    ($ty:ty, $kind:expr) => {
        impl Deployment for $ty {
            const KIND: ComponentKind = $kind;

            fn node(&self) -> &NodeTarget {
                &self.node
            }

            fn node_mut(&mut self) -> &mut NodeTarget {
                &mut self.node
            }

            fn module(&self) -> Option<&Module> {
                self.module.as_ref()
            }

            fn name(&self) -> Option<&str> {
                self.name.as_deref()
            }
        }

        impl WireForm for $ty {}

        impl $ty {
            /// Builder method to set the module.
            pub fn with_module(mut self, module: Module) -> Self {
                self.module = Some(module);
                self
            }

            /// Builder method to set the deployment name.
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.name = Some(name.into());
                self
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeployment {
    pub node: NodeTarget,
    pub name: Option<String>,
    pub module: Option<Module>,
    pub config: Option<ToolConfig>,
}

impl ToolDeployment {
    pub fn new(node: impl Into<NodeTarget>) -> Self {
        Self {
            node: node.into(),
            name: None,
            module: None,
            config: None,
        }
    }

    /// Builder method to set the config.
    pub fn with_config(mut self, config: ToolConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbDeployment {
    pub node: NodeTarget,
    pub name: Option<String>,
    pub module: Option<Module>,
    pub config: Option<KbConfig>,
}

impl KbDeployment {
    pub fn new(node: impl Into<NodeTarget>) -> Self {
        Self {
            node: node.into(),
            name: None,
            module: None,
            config: None,
        }
    }

    /// Builder method to set the config.
    pub fn with_config(mut self, config: KbConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDeployment {
    pub node: NodeTarget,
    pub name: Option<String>,
    pub module: Option<Module>,
    pub config: Option<EnvironmentConfig>,
}

impl EnvironmentDeployment {
    pub fn new(node: impl Into<NodeTarget>) -> Self {
        Self {
            node: node.into(),
            name: None,
            module: None,
            config: None,
        }
    }

    /// Builder method to set the config.
    pub fn with_config(mut self, config: EnvironmentConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDeployment {
    pub node: NodeTarget,
    pub name: Option<String>,
    pub module: Option<Module>,
    pub config: Option<AgentConfig>,
    pub data_generation_config: Option<DataGenerationConfig>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub tool_deployments: Vec<ToolDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub environment_deployments: Vec<EnvironmentDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub kb_deployments: Vec<KbDeployment>,
}

impl AgentDeployment {
    pub fn new(node: impl Into<NodeTarget>) -> Self {
        Self {
            node: node.into(),
            name: None,
            module: None,
            config: None,
            data_generation_config: None,
            tool_deployments: Vec::new(),
            environment_deployments: Vec::new(),
            kb_deployments: Vec::new(),
        }
    }

    /// Builder method to set the config.
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builder method to add a tool sub-deployment.
    pub fn with_tool(mut self, tool: ToolDeployment) -> Self {
        self.tool_deployments.push(tool);
        self
    }

    /// Builder method to add an environment sub-deployment.
    pub fn with_environment(mut self, environment: EnvironmentDeployment) -> Self {
        self.environment_deployments.push(environment);
        self
    }

    /// Builder method to add a knowledge-base sub-deployment.
    pub fn with_kb(mut self, kb: KbDeployment) -> Self {
        self.kb_deployments.push(kb);
        self
    }

    /// Resolve this deployment's node and every sub-deployment's node.
    pub fn resolve_all<R: NodeResolver + ?Sized>(&mut self, resolver: &R) -> Result<(), CoreError> {
        self.resolve_node(resolver)?;
        for tool in &mut self.tool_deployments {
            tool.resolve_node(resolver)?;
        }
        for environment in &mut self.environment_deployments {
            environment.resolve_node(resolver)?;
        }
        for kb in &mut self.kb_deployments {
            kb.resolve_node(resolver)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorDeployment {
    pub node: NodeTarget,
    pub name: Option<String>,
    pub module: Option<Module>,
    pub config: Option<OrchestratorConfig>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub agent_deployments: Vec<AgentDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub environment_deployments: Vec<EnvironmentDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub kb_deployments: Vec<KbDeployment>,
}

impl OrchestratorDeployment {
    pub fn new(node: impl Into<NodeTarget>) -> Self {
        Self {
            node: node.into(),
            name: None,
            module: None,
            config: None,
            agent_deployments: Vec::new(),
            environment_deployments: Vec::new(),
            kb_deployments: Vec::new(),
        }
    }

    /// Builder method to set the config.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builder method to add an agent sub-deployment.
    pub fn with_agent(mut self, agent: AgentDeployment) -> Self {
        self.agent_deployments.push(agent);
        self
    }

    /// Builder method to add an environment sub-deployment.
    pub fn with_environment(mut self, environment: EnvironmentDeployment) -> Self {
        self.environment_deployments.push(environment);
        self
    }

    /// Builder method to add a knowledge-base sub-deployment.
    pub fn with_kb(mut self, kb: KbDeployment) -> Self {
        self.kb_deployments.push(kb);
        self
    }

    /// Resolve this deployment's node and, recursively, all sub-deployments.
    pub fn resolve_all<R: NodeResolver + ?Sized>(&mut self, resolver: &R) -> Result<(), CoreError> {
        self.resolve_node(resolver)?;
        for agent in &mut self.agent_deployments {
            agent.resolve_all(resolver)?;
        }
        for environment in &mut self.environment_deployments {
            environment.resolve_node(resolver)?;
        }
        for kb in &mut self.kb_deployments {
            kb.resolve_node(resolver)?;
        }
        Ok(())
    }
}

impl_deployment!(ToolDeployment, ComponentKind::Tool);
impl_deployment!(KbDeployment, ComponentKind::KnowledgeBase);
impl_deployment!(EnvironmentDeployment, ComponentKind::Environment);
impl_deployment!(AgentDeployment, ComponentKind::Agent);
impl_deployment!(OrchestratorDeployment, ComponentKind::Orchestrator);

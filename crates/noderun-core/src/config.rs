//! Component-specific configuration carried by deployments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::StorageType;
use crate::CoreError;

/// LLM provider an agent or tool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmClientType {
    Openai,
    AzureOpenai,
    Anthropic,
    Vllm,
    Litellm,
    Ollama,
    Stability,
}

fn llm_config_name() -> Option<String> {
    Some("llm_config".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "llm_config_name")]
    pub config_name: Option<String>,
    pub client: Option<LlmClientType>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub api_base: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            config_name: llm_config_name(),
            client: None,
            model: None,
            max_tokens: None,
            temperature: None,
            api_base: None,
        }
    }
}

impl LlmConfig {
    pub fn new(client: LlmClientType, model: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            model: Some(model.into()),
            ..Default::default()
        }
    }
}

fn agent_config_name() -> Option<String> {
    Some("agent_config".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "agent_config_name")]
    pub config_name: Option<String>,
    pub llm_config: Option<LlmConfig>,
    pub persona_module: Option<Value>,
    pub system_prompt: Option<Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            config_name: agent_config_name(),
            llm_config: None,
            persona_module: None,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub config_name: Option<String>,
    pub llm_config: Option<LlmConfig>,
}

fn orchestrator_config_name() -> Option<String> {
    Some("orchestrator_config".to_string())
}

fn default_max_rounds() -> Option<u32> {
    Some(5)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "orchestrator_config_name")]
    pub config_name: Option<String>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            config_name: orchestrator_config_name(),
            max_rounds: default_max_rounds(),
        }
    }
}

fn environment_config_name() -> Option<String> {
    Some("environment_config".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "environment_config_name")]
    pub config_name: Option<String>,
    pub environment_type: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            config_name: environment_config_name(),
            environment_type: None,
        }
    }
}

/// Where a knowledge base keeps its data and how it is shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbConfig {
    pub config_name: Option<String>,
    pub storage_type: StorageType,
    pub path: String,
    /// Column name to column type.
    pub kb_schema: Map<String, Value>,
    pub options: Option<Map<String, Value>>,
}

impl KbConfig {
    pub fn new(storage_type: StorageType, path: impl Into<String>) -> Self {
        Self {
            config_name: None,
            storage_type,
            path: path.into(),
            kb_schema: Map::new(),
            options: None,
        }
    }

    /// Builder method to add a schema column.
    pub fn with_column(mut self, name: impl Into<String>, column_type: impl Into<Value>) -> Self {
        self.kb_schema.insert(name.into(), column_type.into());
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.path.is_empty() {
            return Err(CoreError::validation("knowledge base path is empty"));
        }
        Ok(())
    }
}

/// Whether and where a run's inputs/outputs are saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataGenerationConfig {
    pub save_outputs: Option<bool>,
    pub save_outputs_location: Option<String>,
    pub save_outputs_path: Option<String>,
    pub save_inputs: Option<bool>,
    pub save_inputs_location: Option<String>,
    pub default_filename: Option<String>,
}

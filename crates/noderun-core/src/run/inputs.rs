//! Inputs passed to a module when it runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_save_location() -> String {
    "node".to_string()
}

/// Parameters for a module packaged as a docker image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerParams {
    pub docker_image: String,
    #[serde(default)]
    pub docker_command: String,
    #[serde(default)]
    pub docker_num_gpus: u32,
    pub docker_env_vars: Option<Map<String, Value>>,
    pub input_dir: Option<String>,
    pub input_ipfs_hash: Option<String>,
    pub docker_input_dir: Option<String>,
    pub docker_output_dir: Option<String>,
    #[serde(default = "default_save_location")]
    pub save_location: String,
}

impl DockerParams {
    pub fn new(docker_image: impl Into<String>) -> Self {
        Self {
            docker_image: docker_image.into(),
            docker_command: String::new(),
            docker_num_gpus: 0,
            docker_env_vars: None,
            input_dir: None,
            input_ipfs_hash: None,
            docker_input_dir: None,
            docker_output_dir: None,
            save_location: default_save_location(),
        }
    }

    /// Builder method to set the container command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.docker_command = command.into();
        self
    }
}

/// Inputs of a run: docker parameters or a free-form JSON payload.
///
/// Docker parameters are tried first when deserialising; anything without a
/// `docker_image` is kept as plain parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunInputs {
    Docker(DockerParams),
    Params(Value),
}

impl RunInputs {
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Params(value) => Some(value),
            Self::Docker(_) => None,
        }
    }

    /// Look up a top-level parameter by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params().and_then(|v| v.get(key))
    }
}

impl From<Value> for RunInputs {
    fn from(value: Value) -> Self {
        Self::Params(value)
    }
}

impl From<Map<String, Value>> for RunInputs {
    fn from(map: Map<String, Value>) -> Self {
        Self::Params(Value::Object(map))
    }
}

impl From<DockerParams> for RunInputs {
    fn from(params: DockerParams) -> Self {
        Self::Docker(params)
    }
}

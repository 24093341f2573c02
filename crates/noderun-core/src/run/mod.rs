//! Run inputs and runs.
//!
//! A `*RunInput` is what a consumer submits; once the node accepts its
//! signature it is promoted into the matching `*Run`, which adds the
//! lifecycle fields in [`RunState`]. Runs embed their deployment by value.
//! An [`OrchestratorRun`] owns its child [`AgentRun`]s; every other
//! cross-run reference is a [`RunId`] resolved through a [`RunTable`].

mod inputs;
mod state;
mod table;

pub use inputs::{DockerParams, RunInputs};
pub use state::RunState;
pub use table::RunTable;

use serde::{Deserialize, Serialize};

use crate::deployment::{
    AgentDeployment, Deployment, EnvironmentDeployment, KbDeployment, OrchestratorDeployment,
    ToolDeployment,
};
use crate::{ComponentKind, ConsumerId, CoreError, RunId, RunStatus, WireForm};

fn check_identity(consumer_id: &ConsumerId, signature: &str) -> Result<(), CoreError> {
    if consumer_id.as_str().trim().is_empty() {
        return Err(CoreError::validation("consumer_id is empty"));
    }
    if signature.trim().is_empty() {
        return Err(CoreError::signature("run carries no signature"));
    }
    Ok(())
}

/// A run request prior to submission.
pub trait RunRequest: WireForm + Sized {
    const KIND: ComponentKind;

    /// The run this input is promoted into.
    type Run: RunRecord;

    type Deployment: Deployment;

    fn consumer_id(&self) -> &ConsumerId;

    fn signature(&self) -> &str;

    fn deployment(&self) -> &Self::Deployment;

    /// Check the deployment is ready for submission.
    fn validate_deployment(&self) -> Result<(), CoreError> {
        self.deployment().validate_for_submission()
    }

    /// Convert into a pending run without validating. Prefer [`promote`].
    ///
    /// [`promote`]: RunRequest::promote
    fn into_run(self) -> Self::Run;

    fn validate(&self) -> Result<(), CoreError> {
        check_identity(self.consumer_id(), self.signature())?;
        self.validate_deployment()
    }

    /// Validate and turn the input into a fresh `pending` run.
    fn promote(self) -> Result<Self::Run, CoreError> {
        self.validate()?;
        Ok(self.into_run())
    }
}

/// A run created from an accepted input.
pub trait RunRecord: WireForm {
    const KIND: ComponentKind;

    fn consumer_id(&self) -> &ConsumerId;

    fn signature(&self) -> &str;

    fn state(&self) -> &RunState;

    fn state_mut(&mut self) -> &mut RunState;

    fn inputs(&self) -> Option<&RunInputs>;

    fn id(&self) -> Option<&RunId> {
        self.state().id()
    }

    fn status(&self) -> RunStatus {
        self.state().status()
    }

    /// Check consumer identity and signature are present.
    fn validate(&self) -> Result<(), CoreError> {
        check_identity(self.consumer_id(), self.signature())
    }
}

macro_rules! impl_run_record {
    ($ty:ty, $kind:expr) => {
        impl RunRecord for $ty {
            const KIND: ComponentKind = $kind;

            fn consumer_id(&self) -> &ConsumerId {
                &self.consumer_id
            }

            fn signature(&self) -> &str {
                &self.signature
            }

            fn state(&self) -> &RunState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut RunState {
                &mut self.state
            }

            fn inputs(&self) -> Option<&RunInputs> {
                self.inputs.as_ref()
            }
        }

        impl WireForm for $ty {}
    };
}

macro_rules! impl_input_builders {
    ($ty:ty, $deployment:ty) => {
        impl $ty {
            /// Create an input; fails if the consumer id or signature is empty.
            pub fn new(
                consumer_id: impl Into<ConsumerId>,
                deployment: $deployment,
                signature: impl Into<String>,
            ) -> Result<Self, CoreError> {
                let input = Self {
                    consumer_id: consumer_id.into(),
                    deployment,
                    signature: signature.into(),
                    ..Self::empty()
                };
                check_identity(&input.consumer_id, &input.signature)?;
                Ok(input)
            }

            /// Builder method to set the run inputs.
            pub fn with_inputs(mut self, inputs: impl Into<RunInputs>) -> Self {
                self.inputs = Some(inputs.into());
                self
            }
        }

        impl WireForm for $ty {}
    };
}

// ============================================================================
// Agent
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunInput {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: AgentDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub tool_deployments: Vec<ToolDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub environment_deployments: Vec<EnvironmentDeployment>,
    pub kb_deployment: Option<KbDeployment>,
    /// Orchestrator runs this request was issued from.
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    pub signature: String,
}

impl AgentRunInput {
    fn empty() -> Self {
        Self {
            consumer_id: ConsumerId::new(""),
            inputs: None,
            deployment: AgentDeployment::new(crate::node::NodeConfigUser::new("")),
            tool_deployments: Vec::new(),
            environment_deployments: Vec::new(),
            kb_deployment: None,
            orchestrator_runs: Vec::new(),
            signature: String::new(),
        }
    }

    /// Builder method to record the orchestrator run this request came from.
    pub fn with_orchestrator_run(mut self, run_id: RunId) -> Self {
        self.orchestrator_runs.push(run_id);
        self
    }
}

impl RunRequest for AgentRunInput {
    const KIND: ComponentKind = ComponentKind::Agent;
    type Run = AgentRun;
    type Deployment = AgentDeployment;

    fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn deployment(&self) -> &Self::Deployment {
        &self.deployment
    }

    fn into_run(self) -> AgentRun {
        AgentRun {
            consumer_id: self.consumer_id,
            inputs: self.inputs,
            deployment: self.deployment,
            tool_deployments: self.tool_deployments,
            environment_deployments: self.environment_deployments,
            kb_deployment: self.kb_deployment,
            orchestrator_runs: self.orchestrator_runs,
            input_schema_ipfs_hash: None,
            state: RunState::default(),
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: AgentDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub tool_deployments: Vec<ToolDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub environment_deployments: Vec<EnvironmentDeployment>,
    pub kb_deployment: Option<KbDeployment>,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    pub input_schema_ipfs_hash: Option<String>,
    #[serde(flatten)]
    pub state: RunState,
    pub signature: String,
}

// ============================================================================
// Tool
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRunInput {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: ToolDeployment,
    /// Agent run that invoked the tool, if any.
    pub agent_run: Option<RunId>,
    pub signature: String,
}

impl ToolRunInput {
    fn empty() -> Self {
        Self {
            consumer_id: ConsumerId::new(""),
            inputs: None,
            deployment: ToolDeployment::new(crate::node::NodeConfigUser::new("")),
            agent_run: None,
            signature: String::new(),
        }
    }

    /// Builder method to link the invoking agent run.
    pub fn with_agent_run(mut self, run_id: RunId) -> Self {
        self.agent_run = Some(run_id);
        self
    }
}

impl RunRequest for ToolRunInput {
    const KIND: ComponentKind = ComponentKind::Tool;
    type Run = ToolRun;
    type Deployment = ToolDeployment;

    fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn deployment(&self) -> &Self::Deployment {
        &self.deployment
    }

    fn into_run(self) -> ToolRun {
        ToolRun {
            consumer_id: self.consumer_id,
            inputs: self.inputs,
            deployment: self.deployment,
            agent_run: self.agent_run,
            state: RunState::default(),
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRun {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: ToolDeployment,
    pub agent_run: Option<RunId>,
    #[serde(flatten)]
    pub state: RunState,
    pub signature: String,
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorRunInput {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: OrchestratorDeployment,
    pub signature: String,
}

impl OrchestratorRunInput {
    fn empty() -> Self {
        Self {
            consumer_id: ConsumerId::new(""),
            inputs: None,
            deployment: OrchestratorDeployment::new(crate::node::NodeConfigUser::new("")),
            signature: String::new(),
        }
    }
}

impl RunRequest for OrchestratorRunInput {
    const KIND: ComponentKind = ComponentKind::Orchestrator;
    type Run = OrchestratorRun;
    type Deployment = OrchestratorDeployment;

    fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn deployment(&self) -> &Self::Deployment {
        &self.deployment
    }

    fn into_run(self) -> OrchestratorRun {
        OrchestratorRun {
            consumer_id: self.consumer_id,
            inputs: self.inputs,
            deployment: self.deployment,
            agent_runs: Vec::new(),
            input_schema_ipfs_hash: None,
            state: RunState::default(),
            signature: self.signature,
        }
    }
}

/// An orchestrator run and the agent runs it spawned.
///
/// The parent's status is independent of its children: completing every
/// child does not complete the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorRun {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: OrchestratorDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub agent_runs: Vec<AgentRun>,
    pub input_schema_ipfs_hash: Option<String>,
    #[serde(flatten)]
    pub state: RunState,
    pub signature: String,
}

impl OrchestratorRun {
    /// Take ownership of a child agent run, linking it back to this run.
    pub fn push_agent_run(&mut self, mut agent_run: AgentRun) {
        if let Some(id) = self.state.id() {
            if !agent_run.orchestrator_runs.contains(id) {
                agent_run.orchestrator_runs.push(id.clone());
            }
        }
        self.agent_runs.push(agent_run);
    }

    pub fn agent_run(&self, id: &RunId) -> Option<&AgentRun> {
        self.agent_runs.iter().find(|r| r.state.id() == Some(id))
    }

    pub fn agent_run_mut(&mut self, id: &RunId) -> Option<&mut AgentRun> {
        self.agent_runs.iter_mut().find(|r| r.state.id() == Some(id))
    }
}

// ============================================================================
// Environment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRunInput {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: EnvironmentDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    pub signature: String,
}

impl EnvironmentRunInput {
    fn empty() -> Self {
        Self {
            consumer_id: ConsumerId::new(""),
            inputs: None,
            deployment: EnvironmentDeployment::new(crate::node::NodeConfigUser::new("")),
            orchestrator_runs: Vec::new(),
            signature: String::new(),
        }
    }
}

impl RunRequest for EnvironmentRunInput {
    const KIND: ComponentKind = ComponentKind::Environment;
    type Run = EnvironmentRun;
    type Deployment = EnvironmentDeployment;

    fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn deployment(&self) -> &Self::Deployment {
        &self.deployment
    }

    fn into_run(self) -> EnvironmentRun {
        EnvironmentRun {
            consumer_id: self.consumer_id,
            inputs: self.inputs,
            deployment: self.deployment,
            orchestrator_runs: self.orchestrator_runs,
            input_schema_ipfs_hash: None,
            state: RunState::default(),
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRun {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: EnvironmentDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    pub input_schema_ipfs_hash: Option<String>,
    #[serde(flatten)]
    pub state: RunState,
    pub signature: String,
}

// ============================================================================
// Knowledge base
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbRunInput {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: KbDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    pub signature: String,
}

impl KbRunInput {
    fn empty() -> Self {
        Self {
            consumer_id: ConsumerId::new(""),
            inputs: None,
            deployment: KbDeployment::new(crate::node::NodeConfigUser::new("")),
            orchestrator_runs: Vec::new(),
            signature: String::new(),
        }
    }
}

impl RunRequest for KbRunInput {
    const KIND: ComponentKind = ComponentKind::KnowledgeBase;
    type Run = KbRun;
    type Deployment = KbDeployment;

    fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn deployment(&self) -> &KbDeployment {
        &self.deployment
    }

    fn validate_deployment(&self) -> Result<(), CoreError> {
        self.deployment.validate_for_submission()?;
        match &self.deployment.config {
            Some(config) => config.validate(),
            None => Ok(()),
        }
    }

    fn into_run(self) -> KbRun {
        KbRun {
            consumer_id: self.consumer_id,
            inputs: self.inputs,
            deployment: self.deployment,
            orchestrator_runs: self.orchestrator_runs,
            state: RunState::default(),
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbRun {
    pub consumer_id: ConsumerId,
    pub inputs: Option<RunInputs>,
    pub deployment: KbDeployment,
    #[serde(default, deserialize_with = "crate::wire::null_as_empty")]
    pub orchestrator_runs: Vec<RunId>,
    #[serde(flatten)]
    pub state: RunState,
    pub signature: String,
}

impl_input_builders!(AgentRunInput, AgentDeployment);
impl_input_builders!(ToolRunInput, ToolDeployment);
impl_input_builders!(OrchestratorRunInput, OrchestratorDeployment);
impl_input_builders!(EnvironmentRunInput, EnvironmentDeployment);
impl_input_builders!(KbRunInput, KbDeployment);

impl_run_record!(AgentRun, ComponentKind::Agent);
impl_run_record!(ToolRun, ComponentKind::Tool);
impl_run_record!(OrchestratorRun, ComponentKind::Orchestrator);
impl_run_record!(EnvironmentRun, ComponentKind::Environment);
impl_run_record!(KbRun, ComponentKind::KnowledgeBase);

/// Any run, tagged by component kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Run {
    Agent(AgentRun),
    Tool(ToolRun),
    Orchestrator(OrchestratorRun),
    Environment(EnvironmentRun),
    Kb(KbRun),
}

impl Run {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Agent(_) => ComponentKind::Agent,
            Self::Tool(_) => ComponentKind::Tool,
            Self::Orchestrator(_) => ComponentKind::Orchestrator,
            Self::Environment(_) => ComponentKind::Environment,
            Self::Kb(_) => ComponentKind::KnowledgeBase,
        }
    }

    pub fn state(&self) -> &RunState {
        match self {
            Self::Agent(r) => &r.state,
            Self::Tool(r) => &r.state,
            Self::Orchestrator(r) => &r.state,
            Self::Environment(r) => &r.state,
            Self::Kb(r) => &r.state,
        }
    }

    pub fn state_mut(&mut self) -> &mut RunState {
        match self {
            Self::Agent(r) => &mut r.state,
            Self::Tool(r) => &mut r.state,
            Self::Orchestrator(r) => &mut r.state,
            Self::Environment(r) => &mut r.state,
            Self::Kb(r) => &mut r.state,
        }
    }

    pub fn consumer_id(&self) -> &ConsumerId {
        match self {
            Self::Agent(r) => &r.consumer_id,
            Self::Tool(r) => &r.consumer_id,
            Self::Orchestrator(r) => &r.consumer_id,
            Self::Environment(r) => &r.consumer_id,
            Self::Kb(r) => &r.consumer_id,
        }
    }

    pub fn id(&self) -> Option<&RunId> {
        self.state().id()
    }

    pub fn status(&self) -> RunStatus {
        self.state().status()
    }

    /// Runs this run points at for provenance (not owned children).
    pub fn linked_runs(&self) -> Vec<&RunId> {
        match self {
            Self::Agent(r) => r.orchestrator_runs.iter().collect(),
            Self::Tool(r) => r.agent_run.iter().collect(),
            Self::Orchestrator(_) => Vec::new(),
            Self::Environment(r) => r.orchestrator_runs.iter().collect(),
            Self::Kb(r) => r.orchestrator_runs.iter().collect(),
        }
    }
}

impl WireForm for Run {}

macro_rules! impl_from_run {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Run {
            fn from(run: $ty) -> Self {
                Self::$variant(run)
            }
        }
    };
}

impl_from_run!(Agent, AgentRun);
impl_from_run!(Tool, ToolRun);
impl_from_run!(Orchestrator, OrchestratorRun);
impl_from_run!(Environment, EnvironmentRun);
impl_from_run!(Kb, KbRun);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeConfig, NodeConfigUser};
    use crate::Module;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn node() -> NodeConfig {
        NodeConfig::new("test_node", "test_user", "localhost", 7001).with_public_key("test_key")
    }

    fn agent_deployment() -> AgentDeployment {
        AgentDeployment::new(node()).with_module(Module::new("hello_world_agent"))
    }

    fn orchestrator_deployment() -> OrchestratorDeployment {
        OrchestratorDeployment::new(node()).with_module(Module::new("multiagent_chat"))
    }

    fn agent_run(id: &str) -> AgentRun {
        let mut run = AgentRunInput::new("user:test", agent_deployment(), "sig")
            .unwrap()
            .promote()
            .unwrap();
        run.state.accept(RunId::new(id), ts("2024-01-01T00:00:00Z")).unwrap();
        run
    }

    #[test]
    fn test_empty_signature_rejected_at_construction() {
        let err = AgentRunInput::new("user:test", agent_deployment(), "").unwrap_err();
        assert!(matches!(err, CoreError::Signature(_)));
        let err = ToolRunInput::new("user:test", ToolDeployment::new(node()), "  ").unwrap_err();
        assert!(matches!(err, CoreError::Signature(_)));
    }

    #[test]
    fn test_empty_signature_rejected_at_promotion() {
        let mut input = AgentRunInput::new("user:test", agent_deployment(), "sig").unwrap();
        input.signature.clear();
        assert!(matches!(input.promote(), Err(CoreError::Signature(_))));
    }

    #[test]
    fn test_deserialized_run_without_signature_fails_validation() {
        let mut value = serde_json::to_value(agent_run("agent_run:1")).unwrap();
        value["signature"] = json!("");
        let run: AgentRun = serde_json::from_value(value).unwrap();
        assert!(matches!(run.validate(), Err(CoreError::Signature(_))));
    }

    #[test]
    fn test_promoted_run_is_pending() {
        let run = AgentRunInput::new("user:test", agent_deployment(), "sig")
            .unwrap()
            .with_inputs(json!({"prompt": "hi"}))
            .promote()
            .unwrap();
        assert_eq!(run.status(), RunStatus::Pending);
        assert!(run.id().is_none());
        assert!(run.state.results().is_empty());
        assert!(run.state.created_time().is_none());
        assert_eq!(run.inputs.as_ref().and_then(|i| i.get("prompt")), Some(&json!("hi")));
    }

    #[test]
    fn test_unresolved_agent_node_rejected_at_promotion() {
        let deployment =
            AgentDeployment::new(NodeConfigUser::new("localhost")).with_module(Module::new("a"));
        let input = AgentRunInput::new("user:test", deployment, "sig").unwrap();
        assert!(matches!(input.promote(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_deployment_is_copied_into_input() {
        let mut deployment = agent_deployment();
        let input = AgentRunInput::new("user:test", deployment.clone(), "sig").unwrap();
        deployment.name = Some("changed".to_string());
        let run = input.promote().unwrap();
        assert!(run.deployment.name.is_none());
    }

    #[test]
    fn test_orchestrator_wire_form_is_recursive() {
        let mut orchestrator =
            OrchestratorRunInput::new("user:test", orchestrator_deployment(), "sig")
                .unwrap()
                .promote()
                .unwrap();
        orchestrator
            .state
            .accept(RunId::new("orchestrator_run:1"), ts("2024-01-01T00:00:00Z"))
            .unwrap();

        let mut child = agent_run("agent_run:1");
        child.state.start_at(ts("2024-01-01T00:00:01Z")).unwrap();
        orchestrator.push_agent_run(child);

        let wire = orchestrator.to_wire().unwrap();
        assert_eq!(wire["status"], json!("pending"));
        assert_eq!(wire["created_time"], json!("2024-01-01T00:00:00Z"));
        let child = &wire["agent_runs"][0];
        assert_eq!(child["status"], json!("processing"));
        assert_eq!(child["start_processing_time"], json!("2024-01-01T00:00:01Z"));
        assert_eq!(child["orchestrator_runs"], json!(["orchestrator_run:1"]));
        assert_eq!(child["deployment"]["node"]["server_type"], json!("http"));
    }

    #[test]
    fn test_children_completing_does_not_complete_parent() {
        let mut orchestrator =
            OrchestratorRunInput::new("user:test", orchestrator_deployment(), "sig")
                .unwrap()
                .promote()
                .unwrap();
        orchestrator.state.start().unwrap();
        orchestrator.push_agent_run(agent_run("agent_run:1"));
        orchestrator.push_agent_run(agent_run("agent_run:2"));

        for id in ["agent_run:1", "agent_run:2"] {
            let child = orchestrator.agent_run_mut(&RunId::new(id)).unwrap();
            child.state.start().unwrap();
            child.state.complete(vec!["ok".to_string()]).unwrap();
        }

        assert!(orchestrator
            .agent_runs
            .iter()
            .all(|r| r.status() == RunStatus::Completed));
        assert_eq!(orchestrator.status(), RunStatus::Processing);
        assert!(orchestrator.state.completed_time().is_none());
    }

    #[test]
    fn test_run_wire_round_trip() {
        let mut run = agent_run("agent_run:7");
        run.state.start_at(ts("2024-01-01T00:00:00Z")).unwrap();
        run.state
            .complete_at(ts("2024-01-01T00:00:10Z"), vec!["result".to_string()])
            .unwrap();
        let wire = run.to_wire().unwrap();
        assert_eq!(wire["duration"], json!(10.0));
        assert_eq!(wire["error"], json!(false));

        let back: AgentRun = crate::wire::from_wire(wire).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn test_any_run_reports_links() {
        let deployment = ToolDeployment::new(node()).with_module(Module::new("t"));
        let tool = ToolRunInput::new("user:test", deployment, "sig")
            .unwrap()
            .with_agent_run(RunId::new("agent_run:1"))
            .promote()
            .unwrap();
        let run = Run::from(tool);
        assert_eq!(run.kind(), ComponentKind::Tool);
        assert_eq!(run.linked_runs(), vec![&RunId::new("agent_run:1")]);
        let wire = run.to_wire().unwrap();
        assert_eq!(wire["kind"], json!("tool"));
    }

    #[test]
    fn test_null_lists_in_input_payload_read_as_empty() {
        let input = AgentRunInput::new("user:test", agent_deployment(), "sig").unwrap();
        let mut value = serde_json::to_value(input).unwrap();
        value["tool_deployments"] = json!(null);
        value["environment_deployments"] = json!(null);
        value["orchestrator_runs"] = json!(null);
        value["deployment"]["kb_deployments"] = json!(null);

        let input: AgentRunInput = serde_json::from_value(value).unwrap();
        assert!(input.tool_deployments.is_empty());
        assert!(input.orchestrator_runs.is_empty());
        assert!(input.deployment.kb_deployments.is_empty());
        assert_eq!(input.promote().unwrap().status(), RunStatus::Pending);
    }
}

//! Node client boundary.

use async_trait::async_trait;
use noderun_core::run::{
    AgentRun, AgentRunInput, EnvironmentRun, EnvironmentRunInput, KbRun, KbRunInput,
    OrchestratorRun, OrchestratorRunInput, ToolRun, ToolRunInput,
};
use noderun_core::{Run, RunId};

use crate::error::NodeResult;

/// Submits signed run inputs to a node and queries their runs.
///
/// Each `run_*` call returns the run as the node last recorded it; its
/// status may still be `pending` or `processing` for remote nodes. Use
/// [`NodeClient::check_run`] to poll.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn run_agent(&self, input: AgentRunInput) -> NodeResult<AgentRun>;

    async fn run_tool(&self, input: ToolRunInput) -> NodeResult<ToolRun>;

    async fn run_orchestrator(&self, input: OrchestratorRunInput) -> NodeResult<OrchestratorRun>;

    async fn run_environment(&self, input: EnvironmentRunInput) -> NodeResult<EnvironmentRun>;

    async fn run_kb(&self, input: KbRunInput) -> NodeResult<KbRun>;

    /// Current state of a run this node accepted.
    async fn check_run(&self, run_id: &RunId) -> NodeResult<Run>;
}

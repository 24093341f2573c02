//! Run arena keyed by run id.

use std::collections::HashMap;

use super::{AgentRun, OrchestratorRun, Run};
use crate::{CoreError, RunId};

/// Accepted runs, keyed by the id their node assigned.
///
/// Provenance links on runs are plain [`RunId`]s; the table is where they
/// are resolved back into runs.
#[derive(Debug, Clone, Default)]
pub struct RunTable {
    runs: HashMap<RunId, Run>,
}

impl RunTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an accepted run. Runs without an id are rejected, as are ids
    /// already present.
    pub fn insert(&mut self, run: impl Into<Run>) -> Result<RunId, CoreError> {
        let run = run.into();
        let id = run
            .id()
            .cloned()
            .ok_or_else(|| CoreError::validation("run has not been accepted"))?;
        if self.runs.contains_key(&id) {
            return Err(CoreError::validation(format!("run '{id}' already exists")));
        }
        self.runs.insert(id.clone(), run);
        Ok(id)
    }

    pub fn get(&self, id: &RunId) -> Option<&Run> {
        self.runs.get(id)
    }

    pub fn get_mut(&mut self, id: &RunId) -> Option<&mut Run> {
        self.runs.get_mut(id)
    }

    pub fn remove(&mut self, id: &RunId) -> Option<Run> {
        self.runs.remove(id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RunId, &Run)> {
        self.runs.iter()
    }

    /// Runs that are neither completed nor failed.
    pub fn active(&self) -> impl Iterator<Item = &Run> {
        self.runs.values().filter(|run| run.status().is_active())
    }

    /// Orchestrator runs a run claims as its origin. Ids not in the table
    /// are skipped.
    pub fn orchestrator_runs_of(&self, id: &RunId) -> Vec<&OrchestratorRun> {
        let Some(run) = self.runs.get(id) else {
            return Vec::new();
        };
        run.linked_runs()
            .into_iter()
            .filter_map(|linked| match self.runs.get(linked) {
                Some(Run::Orchestrator(orchestrator)) => Some(orchestrator),
                _ => None,
            })
            .collect()
    }

    /// Agent run that invoked a tool run.
    pub fn agent_run_of(&self, tool_run: &RunId) -> Option<&AgentRun> {
        let Some(Run::Tool(tool)) = self.runs.get(tool_run) else {
            return None;
        };
        match self.runs.get(tool.agent_run.as_ref()?) {
            Some(Run::Agent(agent)) => Some(agent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::{
        AgentDeployment, EnvironmentDeployment, OrchestratorDeployment, ToolDeployment,
    };
    use crate::node::NodeConfig;
    use crate::run::{
        AgentRunInput, EnvironmentRunInput, OrchestratorRunInput, RunRequest, ToolRunInput,
    };
    use crate::{Module, RunStatus};
    use chrono::Utc;

    fn node() -> NodeConfig {
        NodeConfig::new("n1", "owner", "localhost", 7001)
    }

    fn orchestrator(id: &str) -> OrchestratorRun {
        let mut run = OrchestratorRunInput::new(
            "user:test",
            OrchestratorDeployment::new(node()).with_module(Module::new("orchestrator")),
            "sig",
        )
        .unwrap()
        .promote()
        .unwrap();
        run.state.accept(RunId::new(id), Utc::now()).unwrap();
        run
    }

    #[test]
    fn test_insert_requires_id() {
        let mut table = RunTable::new();
        let run = OrchestratorRunInput::new(
            "user:test",
            OrchestratorDeployment::new(node()).with_module(Module::new("orchestrator")),
            "sig",
        )
        .unwrap()
        .promote()
        .unwrap();
        assert!(table.insert(run).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = RunTable::new();
        table.insert(orchestrator("orchestrator_run:1")).unwrap();
        assert!(table.insert(orchestrator("orchestrator_run:1")).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_environment_provenance() {
        let mut table = RunTable::new();
        let parent = table.insert(orchestrator("orchestrator_run:1")).unwrap();

        let mut env = EnvironmentRunInput::new(
            "user:test",
            EnvironmentDeployment::new(node()).with_module(Module::new("chess")),
            "sig",
        )
        .unwrap();
        env.orchestrator_runs.push(parent.clone());
        env.orchestrator_runs.push(RunId::new("orchestrator_run:missing"));
        let mut env = env.promote().unwrap();
        env.state.accept(RunId::new("environment_run:1"), Utc::now()).unwrap();
        let env_id = table.insert(env).unwrap();

        let parents = table.orchestrator_runs_of(&env_id);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].state.id(), Some(&parent));
    }

    #[test]
    fn test_resolve_tool_to_agent() {
        let mut table = RunTable::new();
        let mut agent = AgentRunInput::new(
            "user:test",
            AgentDeployment::new(node()).with_module(Module::new("agent")),
            "sig",
        )
        .unwrap()
        .promote()
        .unwrap();
        agent.state.accept(RunId::new("agent_run:1"), Utc::now()).unwrap();
        let agent_id = table.insert(agent).unwrap();

        let mut tool = ToolRunInput::new(
            "user:test",
            ToolDeployment::new(node()).with_module(Module::new("tool")),
            "sig",
        )
        .unwrap()
        .with_agent_run(agent_id.clone())
        .promote()
        .unwrap();
        tool.state.accept(RunId::new("tool_run:1"), Utc::now()).unwrap();
        let tool_id = table.insert(tool).unwrap();

        let found = table.agent_run_of(&tool_id).unwrap();
        assert_eq!(found.state.id(), Some(&agent_id));
        assert!(table.agent_run_of(&agent_id).is_none());
    }

    #[test]
    fn test_active_filters_terminal_runs() {
        let mut table = RunTable::new();
        let mut done = orchestrator("orchestrator_run:1");
        done.state.start().unwrap();
        done.state.complete(Vec::new()).unwrap();
        table.insert(done).unwrap();
        table.insert(orchestrator("orchestrator_run:2")).unwrap();

        let active: Vec<_> = table.active().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status(), RunStatus::Pending);
    }
}

//! In-process executing node.
//!
//! Accepts signed run inputs from registered consumers, assigns run ids,
//! executes the deployment's module through a [`ModuleHandler`] and records
//! every run in a [`RunTable`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use noderun_core::deployment::Deployment;
use noderun_core::run::{
    AgentRun, AgentRunInput, EnvironmentRun, EnvironmentRunInput, KbRun, KbRunInput,
    OrchestratorRun, OrchestratorRunInput, RunInputs, ToolRun, ToolRunInput,
};
use noderun_core::{
    verify_consumer_signature, ComponentKind, ConsumerId, CoreError, Module, NodeConfig,
    NodeConfigUser, NodeResolver, Run, RunId, RunRecord, RunRequest, RunTable,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::NodeClient;
use crate::config::NodeSettings;
use crate::error::{NodeError, NodeResult};

/// Executes a module on behalf of a run.
///
/// Returning an error marks the run as failed with the error's message.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    async fn execute(
        &self,
        kind: ComponentKind,
        module: &Module,
        inputs: Option<&RunInputs>,
    ) -> NodeResult<Vec<String>>;
}

/// Adapts a synchronous closure into a [`ModuleHandler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(ComponentKind, &Module, Option<&RunInputs>) -> NodeResult<Vec<String>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ModuleHandler for FnHandler<F>
where
    F: Fn(ComponentKind, &Module, Option<&RunInputs>) -> NodeResult<Vec<String>> + Send + Sync,
{
    async fn execute(
        &self,
        kind: ComponentKind,
        module: &Module,
        inputs: Option<&RunInputs>,
    ) -> NodeResult<Vec<String>> {
        (self.0)(kind, module, inputs)
    }
}

/// A node running modules in this process.
pub struct LocalNode {
    settings: NodeSettings,
    consumers: RwLock<HashMap<ConsumerId, String>>,
    handlers: RwLock<HashMap<String, Arc<dyn ModuleHandler>>>,
    runs: RwLock<RunTable>,
}

impl LocalNode {
    pub fn new(settings: NodeSettings) -> Self {
        Self {
            settings,
            consumers: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            runs: RwLock::new(RunTable::new()),
        }
    }

    /// Descriptor this node advertises.
    pub fn node_config(&self) -> &NodeConfig {
        &self.settings.node
    }

    /// Register the hex public key runs from `consumer_id` must verify against.
    pub async fn register_consumer(&self, consumer_id: ConsumerId, public_key: impl Into<String>) {
        info!(consumer_id = %consumer_id, "Registered consumer");
        self.consumers
            .write()
            .await
            .insert(consumer_id, public_key.into());
    }

    /// Register the handler executing the module named `module_name`.
    pub async fn register_module(
        &self,
        module_name: impl Into<String>,
        handler: Arc<dyn ModuleHandler>,
    ) {
        let module_name = module_name.into();
        info!(module = %module_name, "Registered module handler");
        self.handlers.write().await.insert(module_name, handler);
    }

    /// Number of runs still pending or processing.
    pub async fn active_runs(&self) -> usize {
        self.runs.read().await.active().count()
    }

    async fn verify(&self, consumer_id: &ConsumerId, signature: &str) -> NodeResult<()> {
        let consumers = self.consumers.read().await;
        let public_key = consumers.get(consumer_id).ok_or_else(|| {
            warn!(consumer_id = %consumer_id, "Rejected run from unknown consumer");
            NodeError::UnknownConsumer(consumer_id.clone())
        })?;
        verify_consumer_signature(consumer_id, signature, public_key).map_err(|err| {
            warn!(consumer_id = %consumer_id, error = %err, "Rejected run signature");
            NodeError::from(err)
        })
    }

    fn check_target<D: Deployment>(&self, deployment: &D) -> NodeResult<()> {
        match deployment.node().resolved() {
            Some(node) if node.id == self.settings.node.id => Ok(()),
            Some(node) => Err(CoreError::validation(format!(
                "deployment targets node '{}', this is '{}'",
                node.id, self.settings.node.id
            ))
            .into()),
            None => Err(CoreError::validation("deployment node is not resolved").into()),
        }
    }

    async fn store<R>(&self, run: &R) -> NodeResult<()>
    where
        R: RunRecord + Clone + Into<Run>,
    {
        let id = run
            .id()
            .cloned()
            .ok_or_else(|| CoreError::validation("run has not been accepted"))?;
        let mut runs = self.runs.write().await;
        let slot = runs
            .get_mut(&id)
            .ok_or_else(|| NodeError::RunNotFound(id.clone()))?;
        *slot = run.clone().into();
        Ok(())
    }

    /// Verify, accept, execute and record a run input.
    async fn submit<I>(&self, input: I) -> NodeResult<I::Run>
    where
        I: RunRequest + Send,
        I::Run: Clone + Into<Run> + Send + Sync,
    {
        input.validate()?;
        self.verify(input.consumer_id(), input.signature()).await?;
        self.check_target(input.deployment())?;
        let module = input
            .deployment()
            .module()
            .cloned()
            .ok_or_else(|| CoreError::validation("deployment has no module"))?;

        let kind = I::KIND;
        let mut run = input.promote()?;
        let run_id = RunId::new(format!("{kind}_run:{}", Uuid::new_v4()));
        {
            let mut runs = self.runs.write().await;
            let limit = self.settings.max_concurrent_runs;
            if runs.active().count() >= limit {
                warn!(limit, "Rejected run, node at capacity");
                return Err(NodeError::AtCapacity { limit });
            }
            run.state_mut().accept(run_id.clone(), Utc::now())?;
            runs.insert(run.clone())?;
        }
        info!(
            run_id = %run_id,
            kind = %kind,
            consumer_id = %run.consumer_id(),
            module = %module.name,
            "Run accepted"
        );

        let handler = self.handlers.read().await.get(&module.name).cloned();
        match handler {
            Some(handler) => {
                run.state_mut().start()?;
                self.store(&run).await?;
                debug!(run_id = %run_id, "Run processing");

                let outcome = handler.execute(kind, &module, run.inputs()).await;
                match outcome {
                    Ok(results) => run.state_mut().complete(results)?,
                    Err(err) => run.state_mut().fail(err.to_string())?,
                }
            }
            None => {
                let err = NodeError::ModuleNotFound(module.name.clone());
                run.state_mut().fail(err.to_string())?;
            }
        }
        self.store(&run).await?;

        info!(
            run_id = %run_id,
            status = %run.status(),
            duration = ?run.state().duration(),
            "Run finished"
        );
        Ok(run)
    }
}

/// Resolves user-supplied addresses to this node's descriptor.
impl NodeResolver for LocalNode {
    fn resolve(&self, target: &NodeConfigUser) -> Result<NodeConfig, CoreError> {
        if target.matches(&self.settings.node) {
            Ok(self.settings.node.clone())
        } else {
            Err(CoreError::NotFound(format!("node at {}", target.ip)))
        }
    }
}

#[async_trait]
impl NodeClient for LocalNode {
    async fn run_agent(&self, input: AgentRunInput) -> NodeResult<AgentRun> {
        self.submit(input).await
    }

    async fn run_tool(&self, input: ToolRunInput) -> NodeResult<ToolRun> {
        self.submit(input).await
    }

    async fn run_orchestrator(&self, input: OrchestratorRunInput) -> NodeResult<OrchestratorRun> {
        self.submit(input).await
    }

    async fn run_environment(&self, input: EnvironmentRunInput) -> NodeResult<EnvironmentRun> {
        self.submit(input).await
    }

    async fn run_kb(&self, input: KbRunInput) -> NodeResult<KbRun> {
        self.submit(input).await
    }

    async fn check_run(&self, run_id: &RunId) -> NodeResult<Run> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| NodeError::RunNotFound(run_id.clone()))
    }
}

use crate::executor::{ExecutionSlot, ExecutionTable, WorkflowExecutor};
use crate::registry::{ExecutorRegistry, NodeTypeInfo};
use chrono::Utc;
use contentcore::{
    ExecutionId, ExecutionLogEntry, ExecutionStatus, NodeStatus, ValidationError, Value,
    WorkflowDefinition, WorkflowError, WorkflowExecution, WorkflowId,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Main entry point: stores definitions and launches, tracks and cancels
/// executions
///
/// All state lives in memory for the lifetime of the engine value.
pub struct WorkflowEngine {
    registry: Arc<ExecutorRegistry>,
    executor: WorkflowExecutor,
    workflows: Arc<RwLock<HashMap<WorkflowId, Arc<WorkflowDefinition>>>>,
    executions: ExecutionTable,
}

impl WorkflowEngine {
    /// Create an engine with an empty registry and default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an empty registry
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(Arc::new(ExecutorRegistry::new()), config)
    }

    /// Create an engine with a pre-populated executor registry
    pub fn with_registry(registry: Arc<ExecutorRegistry>, config: EngineConfig) -> Self {
        let executions: ExecutionTable = Arc::new(RwLock::new(HashMap::new()));
        let executor = WorkflowExecutor::new(
            registry.clone(),
            executions.clone(),
            config.default_node_timeout,
        );

        Self {
            registry,
            executor,
            workflows: Arc::new(RwLock::new(HashMap::new())),
            executions,
        }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Validate and store a definition
    ///
    /// Checks node id uniqueness, each node's config against its registered
    /// executor, and edge endpoints. Nothing is stored on failure.
    pub async fn create_workflow(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowId, ValidationError> {
        self.validate(&definition)?;

        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&definition.id) {
            return Err(ValidationError::AlreadyExists(definition.id));
        }

        let id = definition.id.clone();
        tracing::info!("Created workflow: {} ({})", definition.name, id);
        workflows.insert(id.clone(), Arc::new(definition));
        Ok(id)
    }

    fn validate(&self, definition: &WorkflowDefinition) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for node in &definition.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ValidationError::DuplicateNode(node.id.clone()));
            }
        }

        for node in &definition.nodes {
            if !self.registry.validate_config(node.node_type, &node.config) {
                tracing::error!("Invalid config for node {}", node.id);
                return Err(ValidationError::InvalidNodeConfig {
                    node_id: node.id.clone(),
                    node_type: node.node_type,
                });
            }
        }

        for edge in &definition.edges {
            if !seen.contains(edge.from.as_str()) || !seen.contains(edge.to.as_str()) {
                tracing::error!("Invalid edge: {} -> {}", edge.from, edge.to);
                return Err(ValidationError::UnknownEdgeNode {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            }
        }

        Ok(())
    }

    /// Start an execution and return its id without waiting for it
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: HashMap<String, Value>,
    ) -> Result<ExecutionId, WorkflowError> {
        let workflow = self.get_workflow(workflow_id).await?;

        let record = WorkflowExecution::new(&workflow, input.clone());
        let execution_id = record.id;
        let cancel = CancellationToken::new();

        self.executions.write().await.insert(
            execution_id,
            ExecutionSlot {
                record,
                cancel: Some(cancel.clone()),
                task: None,
            },
        );

        let executor = self.executor.clone();
        let handle = tokio::spawn(async move {
            executor.run(execution_id, workflow, input, cancel).await;
        });

        // the loop may already have finished and cleared its handles
        let mut table = self.executions.write().await;
        if let Some(slot) = table.get_mut(&execution_id) {
            if slot.cancel.is_some() {
                slot.task = Some(handle);
            }
        }

        tracing::info!("Started workflow execution: {}", execution_id);
        Ok(execution_id)
    }

    /// Snapshot of an execution's current state
    pub async fn get_execution_status(
        &self,
        execution_id: ExecutionId,
    ) -> Result<WorkflowExecution, WorkflowError> {
        self.executions
            .read()
            .await
            .get(&execution_id)
            .map(|slot| slot.record.clone())
            .ok_or(WorkflowError::ExecutionNotFound(execution_id))
    }

    /// Output of a completed execution
    pub async fn get_execution_result(
        &self,
        execution_id: ExecutionId,
    ) -> Result<ExecutionResult, WorkflowError> {
        let exec = self.get_execution_status(execution_id).await?;
        if exec.status != ExecutionStatus::Completed {
            return Err(WorkflowError::NotCompleted(exec.status));
        }

        Ok(ExecutionResult {
            execution_id: exec.id,
            workflow_id: exec.workflow_id.clone(),
            status: exec.status,
            execution_time_ms: exec
                .duration()
                .map(|d| d.num_milliseconds().max(0) as u64),
            output_data: exec.output_data,
            execution_log: exec.execution_log,
        })
    }

    /// Request cancellation of a running execution
    ///
    /// Returns false if the execution is unknown or no longer running.
    pub async fn cancel_execution(&self, execution_id: ExecutionId) -> bool {
        let mut table = self.executions.write().await;
        let Some(slot) = table.get_mut(&execution_id) else {
            return false;
        };
        if slot.record.status.is_terminal() {
            return false;
        }
        let Some(cancel) = slot.cancel.take() else {
            return false;
        };

        cancel.cancel();

        let now = Utc::now();
        let exec = &mut slot.record;
        exec.status = ExecutionStatus::Cancelled;
        exec.ended_at = Some(now);
        for node in exec.nodes.iter_mut() {
            if node.status == NodeStatus::Running {
                node.status = NodeStatus::Failed;
                node.error = Some("Cancelled".to_string());
                node.ended_at = Some(now);
            }
        }

        tracing::warn!("Cancelled workflow execution: {}", execution_id);
        true
    }

    /// Cancel every running execution and wait for their loops to exit
    pub async fn shutdown(&self) {
        let running: Vec<ExecutionId> = self
            .executions
            .read()
            .await
            .iter()
            .filter(|(_, slot)| slot.cancel.is_some())
            .map(|(id, _)| *id)
            .collect();

        let mut handles = Vec::new();
        for id in running {
            self.cancel_execution(id).await;
            if let Some(slot) = self.executions.write().await.get_mut(&id) {
                handles.extend(slot.task.take());
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Execution task join error: {}", e);
            }
        }
    }

    /// Executions of one workflow, most recent first
    pub async fn list_executions(&self, workflow_id: &str) -> Vec<WorkflowExecution> {
        let mut executions: Vec<WorkflowExecution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|slot| slot.record.workflow_id == workflow_id)
            .map(|slot| slot.record.clone())
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions
    }

    /// All stored definitions, ordered by id
    pub async fn list_workflows(&self) -> Vec<Arc<WorkflowDefinition>> {
        let mut workflows: Vec<_> = self.workflows.read().await.values().cloned().collect();
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        workflows
    }

    pub async fn get_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        self.workflows
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))
    }

    /// Remove a definition. Executions already started keep running.
    pub async fn delete_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        let removed = self
            .workflows
            .write()
            .await
            .remove(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        tracing::info!("Deleted workflow: {}", workflow_id);
        Ok(removed)
    }

    /// Static metadata for every node type
    pub fn node_types(&self) -> Vec<NodeTypeInfo> {
        self.registry.node_types()
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of a completed execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub output_data: HashMap<String, Value>,
    pub execution_time_ms: Option<u64>,
    pub execution_log: Vec<ExecutionLogEntry>,
}

/// Configuration for the engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Timeout applied to nodes that do not set their own
    pub default_node_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn with_default_node_timeout(mut self, timeout: Duration) -> Self {
        self.default_node_timeout = Some(timeout);
        self
    }
}

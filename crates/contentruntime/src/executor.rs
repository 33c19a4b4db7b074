use crate::graph::DependencyGraph;
use crate::registry::ExecutorRegistry;
use chrono::Utc;
use contentcore::{
    ExecutionId, ExecutionLogEntry, ExecutionStatus, NodeContext, NodeError, NodeStatus, Value,
    WorkflowDefinition, WorkflowError, WorkflowExecution, WorkflowNode,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

/// An execution record plus the handles needed to stop its loop
///
/// `cancel` and `task` are present only while the loop is running.
pub(crate) struct ExecutionSlot {
    pub record: WorkflowExecution,
    pub cancel: Option<CancellationToken>,
    pub task: Option<JoinHandle<()>>,
}

pub(crate) type ExecutionTable = Arc<RwLock<HashMap<ExecutionId, ExecutionSlot>>>;

/// Why a run stopped early
enum RunError {
    Cancelled,
    Failed(WorkflowError),
}

impl From<WorkflowError> for RunError {
    fn from(e: WorkflowError) -> Self {
        RunError::Failed(e)
    }
}

/// Runs one workflow execution layer by layer
///
/// Each iteration dispatches every node whose predecessors have completed,
/// awaits the whole layer, and merges results into the shared context. Every
/// write to the execution record goes through the shared table and is
/// skipped once the record is terminal, so a cancelled run is never
/// overwritten by its own loop.
#[derive(Clone)]
pub(crate) struct WorkflowExecutor {
    registry: Arc<ExecutorRegistry>,
    executions: ExecutionTable,
    default_node_timeout: Option<Duration>,
}

impl WorkflowExecutor {
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        executions: ExecutionTable,
        default_node_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            executions,
            default_node_timeout,
        }
    }

    /// Drive an execution to a terminal state
    pub async fn run(
        &self,
        execution_id: ExecutionId,
        workflow: Arc<WorkflowDefinition>,
        input: HashMap<String, Value>,
        cancel: CancellationToken,
    ) {
        let start_time = Instant::now();
        tracing::info!(
            "Starting workflow execution: {} (workflow {})",
            execution_id,
            workflow.id
        );

        self.update(execution_id, |exec| exec.status = ExecutionStatus::Running)
            .await;

        let result = self
            .execute_dag(execution_id, &workflow, input, &cancel)
            .await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        let mut table = self.executions.write().await;
        let Some(slot) = table.get_mut(&execution_id) else {
            return;
        };
        slot.cancel = None;
        slot.task = None;

        let exec = &mut slot.record;
        if exec.status.is_terminal() {
            tracing::info!(
                "Execution {} stopped as {} after {}ms",
                execution_id,
                exec.status,
                duration_ms
            );
            return;
        }

        exec.ended_at = Some(Utc::now());
        match result {
            Ok(context) => {
                exec.status = ExecutionStatus::Completed;
                exec.output_data = context;
                tracing::info!(
                    "Workflow execution completed: {} in {}ms",
                    execution_id,
                    duration_ms
                );
            }
            Err(RunError::Cancelled) => {
                exec.status = ExecutionStatus::Cancelled;
                tracing::warn!("Workflow execution cancelled: {}", execution_id);
            }
            Err(RunError::Failed(e)) => {
                exec.status = ExecutionStatus::Failed;
                exec.error = Some(e.to_string());
                tracing::error!("Workflow execution failed: {}, error: {}", execution_id, e);
            }
        }
    }

    async fn execute_dag(
        &self,
        execution_id: ExecutionId,
        workflow: &WorkflowDefinition,
        input: HashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, Value>, RunError> {
        let graph = DependencyGraph::build(workflow).map_err(WorkflowError::from)?;

        let mut context = workflow.variables.clone();
        context.extend(input);

        let mut executed: HashSet<String> = HashSet::new();

        while executed.len() < graph.len() {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            let ready = graph.ready_nodes(&executed);
            if ready.is_empty() {
                let pending = workflow
                    .nodes
                    .iter()
                    .filter(|n| !executed.contains(&n.id))
                    .map(|n| n.id.clone())
                    .collect();
                return Err(WorkflowError::Stalled { pending }.into());
            }

            tracing::debug!("Execution {} dispatching layer: {:?}", execution_id, ready);

            // every node in the layer sees the context as it was when the
            // layer was scheduled
            let snapshot = Arc::new(context.clone());
            let mut running = FuturesUnordered::new();

            for node_id in &ready {
                let node = workflow
                    .find_node(node_id)
                    .ok_or_else(|| WorkflowError::NotFound(node_id.clone()))?
                    .clone();

                self.mark_running(execution_id, &node).await;

                let ctx = NodeContext::new(execution_id, snapshot.clone())
                    .with_cancellation(cancel.child_token());
                running.push(self.dispatch(node, ctx));
            }

            let mut first_error: Option<WorkflowError> = None;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RunError::Cancelled),
                    next = running.next() => next,
                };
                let Some((node, outcome, duration_ms)) = next else {
                    break;
                };

                match outcome {
                    Ok(result) => {
                        tracing::info!("Node {} completed in {}ms", node.id, duration_ms);
                        self.record_completed(execution_id, &node, &result).await;
                        // last writer within a layer wins
                        context.extend(result);
                        executed.insert(node.id);
                    }
                    Err(e) => {
                        tracing::error!("Node execution failed: {}, error: {}", node.id, e);
                        self.record_failed(execution_id, &node, &e).await;
                        // siblings already in flight are allowed to finish
                        if first_error.is_none() {
                            first_error = Some(WorkflowError::NodeFailed {
                                node_id: node.id,
                                source: e,
                            });
                        }
                    }
                }
            }

            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        Ok(context)
    }

    /// Execute one node with its executor, applying the node or engine timeout
    async fn dispatch(
        &self,
        node: WorkflowNode,
        ctx: NodeContext,
    ) -> (WorkflowNode, Result<HashMap<String, Value>, NodeError>, u64) {
        let start = Instant::now();

        let Some(executor) = self.registry.get(node.node_type).cloned() else {
            let node_type = node.node_type;
            return (node, Err(NodeError::NoExecutor(node_type)), 0);
        };

        let limit = node
            .timeout_ms
            .map(Duration::from_millis)
            .or(self.default_node_timeout);

        let result = match limit {
            Some(limit) => match timeout(limit, executor.execute(&node, &ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Node {} timed out after {:?}", node.id, limit);
                    Err(NodeError::Timeout {
                        millis: limit.as_millis() as u64,
                    })
                }
            },
            None => executor.execute(&node, &ctx).await,
        };

        (node, result, start.elapsed().as_millis() as u64)
    }

    async fn mark_running(&self, execution_id: ExecutionId, node: &WorkflowNode) {
        self.update(execution_id, |exec| {
            exec.current_node = Some(node.id.clone());
            if let Some(n) = exec.node_mut(&node.id) {
                n.status = NodeStatus::Running;
                n.started_at = Some(Utc::now());
            }
        })
        .await;
    }

    async fn record_completed(
        &self,
        execution_id: ExecutionId,
        node: &WorkflowNode,
        result: &HashMap<String, Value>,
    ) {
        self.update(execution_id, |exec| {
            if let Some(n) = exec.node_mut(&node.id) {
                n.status = NodeStatus::Completed;
                n.result = Some(result.clone());
                n.ended_at = Some(Utc::now());
            }
            exec.execution_log
                .push(ExecutionLogEntry::completed(node, result.clone()));
        })
        .await;
    }

    async fn record_failed(&self, execution_id: ExecutionId, node: &WorkflowNode, error: &NodeError) {
        self.update(execution_id, |exec| {
            if let Some(n) = exec.node_mut(&node.id) {
                n.status = NodeStatus::Failed;
                n.error = Some(error.to_string());
                n.ended_at = Some(Utc::now());
            }
            exec.execution_log
                .push(ExecutionLogEntry::failed(node, error.to_string()));
        })
        .await;
    }

    /// Apply `f` to the execution record unless it is already terminal
    async fn update<F>(&self, execution_id: ExecutionId, f: F) -> bool
    where
        F: FnOnce(&mut WorkflowExecution),
    {
        let mut table = self.executions.write().await;
        match table.get_mut(&execution_id) {
            Some(slot) if !slot.record.status.is_terminal() => {
                f(&mut slot.record);
                true
            }
            _ => false,
        }
    }
}

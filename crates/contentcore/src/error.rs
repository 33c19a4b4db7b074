use crate::{ExecutionId, ExecutionStatus, NodeId, NodeType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single node; aborts the execution it belongs to
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("No executor registered for node type: {0}")]
    NoExecutor(NodeType),

    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Cancelled")]
    Cancelled,
}

/// Raised by `create_workflow`; the definition is not registered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid config for node '{node_id}' ({node_type})")]
    InvalidNodeConfig { node_id: NodeId, node_type: NodeType },

    #[error("Edge {from} -> {to} references an unknown node")]
    UnknownEdgeNode { from: NodeId, to: NodeId },

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Workflow already exists: {0}")]
    AlreadyExists(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    #[error("Invalid workflow: {0}")]
    Invalid(#[from] ValidationError),

    /// No remaining node has all of its predecessors completed
    #[error("Circular dependency or no ready nodes (pending: {})", .pending.join(", "))]
    Stalled { pending: Vec<NodeId> },

    #[error("Node '{node_id}' failed: {source}")]
    NodeFailed {
        node_id: NodeId,
        #[source]
        source: NodeError,
    },

    #[error("Execution has not completed (status: {0})")]
    NotCompleted(ExecutionStatus),
}

impl WorkflowError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotFound(_) | WorkflowError::ExecutionNotFound(_)
        )
    }
}

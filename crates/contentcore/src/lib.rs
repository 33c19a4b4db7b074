//! Core abstractions for the content workflow engine
//!
//! This crate provides the model types, the dynamic value type, the error
//! taxonomy and the executor trait that every other crate builds on. It has
//! no scheduling logic.

mod error;
mod node;
pub mod template;
mod value;
mod workflow;

pub use error::{FlowError, NodeError, ValidationError, WorkflowError};
pub use node::{NodeContext, NodeExecutor, NodeId, NodeStatus, NodeType, WorkflowNode};
pub use value::Value;
pub use workflow::{
    Edge, ExecutionId, ExecutionLogEntry, ExecutionStatus, LogStatus, WorkflowDefinition,
    WorkflowExecution, WorkflowId,
};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

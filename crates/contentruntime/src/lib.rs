//! Workflow execution runtime
//!
//! This crate provides the engine that stores workflow definitions, manages
//! the executor registry, and runs executions as layered DAG schedules on
//! tokio tasks.

mod engine;
mod executor;
mod graph;
mod registry;

pub use engine::{EngineConfig, ExecutionResult, WorkflowEngine};
pub use graph::DependencyGraph;
pub use registry::{ExecutorRegistry, NodeTypeInfo};

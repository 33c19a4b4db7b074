use contentcore::{NodeExecutor, NodeType, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Static description of a node type
#[derive(Debug, Clone, Serialize)]
pub struct NodeTypeInfo {
    pub node_type: NodeType,
    pub description: &'static str,
    pub category: &'static str,
    /// Whether an executor is registered for it
    pub available: bool,
}

/// Registry of node executors, keyed by node type
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor; replaces any previous one for the same type
    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) {
        let node_type = executor.node_type();
        tracing::info!("Registering executor for node type: {}", node_type);
        self.executors.insert(node_type, executor);
    }

    pub fn get(&self, node_type: NodeType) -> Option<&Arc<dyn NodeExecutor>> {
        self.executors.get(&node_type)
    }

    pub fn contains(&self, node_type: NodeType) -> bool {
        self.executors.contains_key(&node_type)
    }

    /// Validate a node config against its executor. Types without a
    /// registered executor pass; they fail later at dispatch.
    pub fn validate_config(&self, node_type: NodeType, config: &HashMap<String, Value>) -> bool {
        self.executors
            .get(&node_type)
            .map(|executor| executor.validate_config(config))
            .unwrap_or(true)
    }

    /// Registered node types
    pub fn list_node_types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|t| self.executors.contains_key(t))
            .collect()
    }

    /// Metadata for every node type, registered or not
    pub fn node_types(&self) -> Vec<NodeTypeInfo> {
        NodeType::ALL
            .into_iter()
            .map(|node_type| NodeTypeInfo {
                node_type,
                description: node_type.description(),
                category: node_type.category(),
                available: self.contains(node_type),
            })
            .collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

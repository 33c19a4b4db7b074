use crate::workflow::ExecutionId;
use crate::{template, NodeError, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type NodeId = String;

/// The fixed set of node kinds a workflow can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Input,
    TextGeneration,
    ImageGeneration,
    MusicGeneration,
    ContentAnalysis,
    ContentOptimization,
    PlatformPublish,
    Condition,
    Loop,
    Merge,
    Output,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Input,
        NodeType::TextGeneration,
        NodeType::ImageGeneration,
        NodeType::MusicGeneration,
        NodeType::ContentAnalysis,
        NodeType::ContentOptimization,
        NodeType::PlatformPublish,
        NodeType::Condition,
        NodeType::Loop,
        NodeType::Merge,
        NodeType::Output,
    ];

    /// Wire name, e.g. `text_generation`
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Input => "input",
            NodeType::TextGeneration => "text_generation",
            NodeType::ImageGeneration => "image_generation",
            NodeType::MusicGeneration => "music_generation",
            NodeType::ContentAnalysis => "content_analysis",
            NodeType::ContentOptimization => "content_optimization",
            NodeType::PlatformPublish => "platform_publish",
            NodeType::Condition => "condition",
            NodeType::Loop => "loop",
            NodeType::Merge => "merge",
            NodeType::Output => "output",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeType::Input => "Receives the caller's input data",
            NodeType::TextGeneration => "Generates text content with a language model",
            NodeType::ImageGeneration => "Generates an image from a prompt",
            NodeType::MusicGeneration => "Generates a music clip from a description",
            NodeType::ContentAnalysis => "Extracts theme, mood, keywords and sentiment",
            NodeType::ContentOptimization => "Adapts content for a target platform",
            NodeType::PlatformPublish => "Publishes content to a platform",
            NodeType::Condition => "Chooses an execution path from a boolean expression",
            NodeType::Loop => "Repeats an operation",
            NodeType::Merge => "Combines several inputs",
            NodeType::Output => "Emits the final result",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            NodeType::Input | NodeType::Output => "input_output",
            NodeType::TextGeneration | NodeType::ImageGeneration | NodeType::MusicGeneration => {
                "ai_generation"
            }
            NodeType::ContentAnalysis | NodeType::ContentOptimization => "processing",
            NodeType::PlatformPublish => "integration",
            NodeType::Condition | NodeType::Loop | NodeType::Merge => "control_flow",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime status of a single node within one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// A typed unit of work in a workflow graph
///
/// The definition holds the template; each execution works on its own copy,
/// so the runtime fields only ever describe one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// Per-node timeout; falls back to the engine default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<NodeId>, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            description: String::new(),
            config: HashMap::new(),
            timeout_ms: None,
            status: NodeStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn config_f64(&self, key: &str, default: f64) -> f64 {
        self.config.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn config_u64(&self, key: &str, default: u64) -> u64 {
        self.config
            .get(key)
            .and_then(Value::as_f64)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64)
            .unwrap_or(default)
    }
}

/// Pluggable strategy that performs the work for one node type
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Node type this executor handles
    fn node_type(&self) -> NodeType;

    /// Run the node against the current context and return the keys to merge
    /// back into it.
    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError>;

    /// Check a node's static config at workflow creation time
    fn validate_config(&self, _config: &HashMap<String, Value>) -> bool {
        true
    }
}

/// Execution context passed to each node
///
/// `vars` is a snapshot of the workflow context taken when the node's ready
/// layer was scheduled.
#[derive(Clone)]
pub struct NodeContext {
    pub execution_id: ExecutionId,

    pub vars: Arc<HashMap<String, Value>>,

    /// Cancelled when the execution is cancelled; long-running executors
    /// should select on it
    pub cancellation: CancellationToken,
}

impl NodeContext {
    pub fn new(execution_id: ExecutionId, vars: Arc<HashMap<String, Value>>) -> Self {
        Self {
            execution_id,
            vars,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Context value as a string, or `""` when absent or not a string
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Substitute `{key}` placeholders from the context
    pub fn render(&self, text: &str) -> String {
        template::render(text, &self.vars)
    }

    /// A string config field with placeholders substituted
    pub fn render_config(&self, node: &WorkflowNode, key: &str) -> Option<String> {
        node.config_str(key).map(|raw| self.render(raw))
    }

    /// Run CPU-bound work on the blocking pool so it does not stall the
    /// scheduler. Returns `Cancelled` if the execution is cancelled first.
    pub async fn offload<F, T>(&self, work: F) -> Result<T, NodeError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(work);
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(NodeError::Cancelled),
            joined = handle => joined
                .map_err(|e| NodeError::ExecutionFailed(format!("Blocking task failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn node_type_wire_names() {
        let json = serde_json::to_string(&NodeType::TextGeneration).unwrap();
        assert_eq!(json, "\"text_generation\"");
        let parsed: NodeType = serde_json::from_str("\"platform_publish\"").unwrap();
        assert_eq!(parsed, NodeType::PlatformPublish);
        for node_type in NodeType::ALL {
            assert_eq!(
                serde_json::to_string(&node_type).unwrap(),
                format!("\"{}\"", node_type.as_str())
            );
        }
    }

    #[test]
    fn node_deserializes_with_defaults() {
        let node: WorkflowNode = serde_json::from_str(
            r#"{"id": "b", "type": "text_generation", "name": "B", "config": {"prompt": "hi"}}"#,
        )
        .unwrap();
        assert_eq!(node.status, NodeStatus::Pending);
        assert_eq!(node.config_str("prompt"), Some("hi"));
        assert!(node.timeout_ms.is_none());
    }

    #[test]
    fn render_config_uses_context() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), Value::from("Ada"));
        let ctx = NodeContext::new(Uuid::new_v4(), Arc::new(vars));
        let node = WorkflowNode::new("b", NodeType::TextGeneration, "B")
            .with_config("prompt", "Hello {name}");
        assert_eq!(ctx.render_config(&node, "prompt").as_deref(), Some("Hello Ada"));
        assert_eq!(ctx.render_config(&node, "missing"), None);
    }

    #[tokio::test]
    async fn offload_runs_on_blocking_pool() {
        let ctx = NodeContext::new(Uuid::new_v4(), Arc::new(HashMap::new()));
        let sum = ctx.offload(|| (1..=100u64).sum::<u64>()).await.unwrap();
        assert_eq!(sum, 5050);
    }

    #[tokio::test]
    async fn offload_observes_cancellation() {
        let ctx = NodeContext::new(Uuid::new_v4(), Arc::new(HashMap::new()));
        ctx.cancellation.cancel();
        let result = ctx
            .offload(|| std::thread::sleep(std::time::Duration::from_millis(200)))
            .await;
        assert!(matches!(result, Err(NodeError::Cancelled)));
    }
}

use async_trait::async_trait;
use contentcore::{NodeContext, NodeError, NodeExecutor, NodeType, Value, WorkflowNode};
use std::collections::HashMap;

/// Pick `fields` out of the context, or the whole context when no field list
/// is configured. Missing fields are skipped.
fn project(node: &WorkflowNode, ctx: &NodeContext, list_key: &str) -> HashMap<String, Value> {
    let Some(fields) = node.config.get(list_key) else {
        return ctx.vars.as_ref().clone();
    };

    let mut picked = HashMap::new();
    for field in fields.string_items() {
        match ctx.get(&field) {
            Some(value) => {
                picked.insert(field, value.clone());
            }
            None => tracing::warn!("Node {}: field '{}' not in context", node.id, field),
        }
    }
    picked
}

fn is_string_list(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(value) => value
            .as_array()
            .map(|items| items.iter().all(|v| v.as_str().is_some()))
            .unwrap_or(false),
    }
}

/// Entry point of a workflow: surfaces the caller's input
pub struct InputExecutor;

#[async_trait]
impl NodeExecutor for InputExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Input
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        Ok(project(node, ctx, "input_fields"))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        is_string_list(config.get("input_fields"))
    }
}

/// Collects the final fields under `output`
pub struct OutputExecutor;

#[async_trait]
impl NodeExecutor for OutputExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Output
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let mut result = HashMap::new();
        result.insert(
            "output".to_string(),
            Value::Object(project(node, ctx, "output_fields")),
        );
        Ok(result)
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        is_string_list(config.get("output_fields"))
    }
}

/// Gathers the listed fields of its upstream branches under `merged`
pub struct MergeExecutor;

#[async_trait]
impl NodeExecutor for MergeExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Merge
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let merged = project(node, ctx, "fields");
        tracing::debug!("Node {} merged {} fields", node.id, merged.len());

        let mut result = HashMap::new();
        result.insert("merged".to_string(), Value::Object(merged));
        Ok(result)
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        is_string_list(config.get("fields"))
    }
}

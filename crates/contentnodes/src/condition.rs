use crate::expression::Expression;
use async_trait::async_trait;
use contentcore::{NodeContext, NodeError, NodeExecutor, NodeType, Value, WorkflowNode};
use std::collections::HashMap;

/// Evaluates `config.condition` and reports which path to take
///
/// Evaluation failures (unknown variables, type mismatches) do not fail the
/// node. They select the `false` path and are reported under `error`.
pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Condition
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let source = node
            .config_str("condition")
            .ok_or_else(|| NodeError::MissingConfig("condition".to_string()))?;

        let outcome = Expression::parse(source).and_then(|expr| expr.is_true(&ctx.vars));

        let mut result = HashMap::new();
        result.insert("condition".to_string(), Value::from(ctx.render(source)));
        match outcome {
            Ok(passed) => {
                tracing::debug!("Node {} condition evaluated to {}", node.id, passed);
                result.insert("condition_result".to_string(), Value::Bool(passed));
                result.insert(
                    "next_path".to_string(),
                    Value::from(if passed { "true" } else { "false" }),
                );
            }
            Err(e) => {
                tracing::error!("Condition evaluation failed for node {}: {}", node.id, e);
                result.insert("condition_result".to_string(), Value::Bool(false));
                result.insert("next_path".to_string(), Value::from("false"));
                result.insert("error".to_string(), Value::from(e.to_string()));
            }
        }
        Ok(result)
    }

    /// The expression must be present and well formed
    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        config
            .get("condition")
            .and_then(Value::as_str)
            .map(|source| Expression::parse(source).is_ok())
            .unwrap_or(false)
    }
}

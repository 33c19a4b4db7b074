use crate::generation::config_or_context_text;
use crate::services::{
    call, AnalysisRequest, AnalysisService, ContentBundle, OptimizationRequest,
    OptimizationService, PublishContent, PublishRequest, PublishService,
};
use async_trait::async_trait;
use contentcore::{NodeContext, NodeError, NodeExecutor, NodeType, Value, WorkflowNode};
use std::collections::HashMap;
use std::sync::Arc;

/// The first of `keys` holding a non-empty string in the context
fn first_text(ctx: &NodeContext, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| ctx.get_str(key))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn requires_platform(config: &HashMap<String, Value>) -> bool {
    config.get("platform").and_then(Value::as_str).is_some()
}

pub struct ContentAnalysisExecutor {
    service: Arc<dyn AnalysisService>,
}

impl ContentAnalysisExecutor {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for ContentAnalysisExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::ContentAnalysis
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let content = config_or_context_text(node, ctx, "content");
        if content.is_empty() {
            tracing::warn!("Node {}: nothing to analyze", node.id);
        }

        let request = AnalysisRequest {
            content,
            analysis_type: node
                .config_str("analysis_type")
                .unwrap_or("comprehensive")
                .to_string(),
        };
        let response = call(ctx, self.service.analyze(request)).await?;

        let mut result = HashMap::new();
        result.insert("theme".to_string(), Value::from(response.theme));
        result.insert("mood".to_string(), Value::from(response.mood));
        result.insert("keywords".to_string(), Value::from(response.keywords));
        result.insert("sentiment".to_string(), Value::from(response.sentiment));
        result.insert("topics".to_string(), Value::from(response.topics));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }
}

pub struct ContentOptimizationExecutor {
    service: Arc<dyn OptimizationService>,
}

impl ContentOptimizationExecutor {
    pub fn new(service: Arc<dyn OptimizationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for ContentOptimizationExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::ContentOptimization
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let platform = ctx
            .render_config(node, "platform")
            .ok_or_else(|| NodeError::MissingConfig("platform".to_string()))?;

        let content = ContentBundle {
            title: ctx.get_str("title").to_string(),
            text: ctx.get_str("text").to_string(),
            image_url: ctx.get_str("image_url").to_string(),
            audio_url: ctx.get_str("audio_url").to_string(),
            theme: ctx.get_str("theme").to_string(),
            mood: ctx.get_str("mood").to_string(),
        };
        let request = OptimizationRequest {
            content,
            platform,
            optimization_level: node
                .config_str("optimization_level")
                .unwrap_or("standard")
                .to_string(),
        };
        let response = call(ctx, self.service.optimize(request)).await?;

        let mut result = HashMap::new();
        result.insert("optimized_title".to_string(), Value::from(response.title));
        result.insert("optimized_content".to_string(), Value::from(response.content));
        result.insert("suggested_tags".to_string(), Value::from(response.tags));
        result.insert("optimization_tips".to_string(), Value::from(response.tips));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        requires_platform(config)
    }
}

pub struct PlatformPublishExecutor {
    service: Arc<dyn PublishService>,
}

impl PlatformPublishExecutor {
    pub fn new(service: Arc<dyn PublishService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for PlatformPublishExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::PlatformPublish
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let platform = ctx
            .render_config(node, "platform")
            .ok_or_else(|| NodeError::MissingConfig("platform".to_string()))?;

        let image_url = ctx.get_str("image_url");
        let content = PublishContent {
            title: first_text(ctx, &["optimized_title", "title"]),
            content: first_text(ctx, &["optimized_content", "text"]),
            images: if image_url.is_empty() {
                Vec::new()
            } else {
                vec![image_url.to_string()]
            },
            audio_url: ctx.get_str("audio_url").to_string(),
            tags: ctx
                .get("suggested_tags")
                .map(Value::string_items)
                .unwrap_or_default(),
            platform_config: node
                .config
                .get("platform_config")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        };
        let request = PublishRequest {
            platform: platform.clone(),
            content,
            user_id: node.config_u64("user_id", 1),
        };

        tracing::info!("Node {} publishing to {}", node.id, platform);
        let response = call(ctx, self.service.publish(request)).await?;

        let mut result = HashMap::new();
        result.insert("published".to_string(), Value::Bool(response.success));
        result.insert("post_id".to_string(), Value::from(response.post_id));
        result.insert("post_url".to_string(), Value::from(response.post_url));
        result.insert("platform".to_string(), Value::from(platform));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        requires_platform(config)
    }
}

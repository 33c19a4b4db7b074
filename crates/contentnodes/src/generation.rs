use crate::services::{
    call, ImageRequest, ImageService, MusicRequest, MusicService, TextRequest, TextService,
};
use async_trait::async_trait;
use contentcore::{NodeContext, NodeError, NodeExecutor, NodeType, Value, WorkflowNode};
use std::collections::HashMap;
use std::sync::Arc;

/// A rendered string config field, falling back to the context's `text`
/// when the field is missing or empty
pub(crate) fn config_or_context_text(node: &WorkflowNode, ctx: &NodeContext, key: &str) -> String {
    match node.config_str(key) {
        Some(raw) if !raw.is_empty() => ctx.render(raw),
        _ => ctx.get_str("text").to_string(),
    }
}

pub struct TextGenerationExecutor {
    service: Arc<dyn TextService>,
}

impl TextGenerationExecutor {
    pub fn new(service: Arc<dyn TextService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for TextGenerationExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::TextGeneration
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let prompt = ctx
            .render_config(node, "prompt")
            .ok_or_else(|| NodeError::MissingConfig("prompt".to_string()))?;
        let model = node.config_str("model").unwrap_or("default").to_string();

        let request = TextRequest {
            prompt: prompt.clone(),
            max_length: node.config_u64("max_length", 500),
            temperature: node.config_f64("temperature", 0.7),
            model: model.clone(),
        };
        tracing::debug!("Node {} generating text ({} chars of prompt)", node.id, prompt.len());
        let response = call(ctx, self.service.generate_text(request)).await?;

        let mut result = HashMap::new();
        result.insert("text".to_string(), Value::from(response.text));
        result.insert("prompt".to_string(), Value::from(prompt));
        result.insert("model".to_string(), Value::from(model));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> bool {
        config.contains_key("prompt")
    }
}

pub struct ImageGenerationExecutor {
    service: Arc<dyn ImageService>,
}

impl ImageGenerationExecutor {
    pub fn new(service: Arc<dyn ImageService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for ImageGenerationExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::ImageGeneration
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let prompt = config_or_context_text(node, ctx, "prompt");
        let style = node.config_str("style").unwrap_or("realistic").to_string();

        let request = ImageRequest {
            prompt: prompt.clone(),
            style: style.clone(),
            width: node.config_u64("width", 512),
            height: node.config_u64("height", 512),
            num_inference_steps: node.config_u64("num_inference_steps", 20),
        };
        let response = call(ctx, self.service.generate_image(request)).await?;

        let mut dimensions = HashMap::new();
        dimensions.insert("width".to_string(), Value::from(response.width as i64));
        dimensions.insert("height".to_string(), Value::from(response.height as i64));

        let mut result = HashMap::new();
        result.insert("image_url".to_string(), Value::from(response.image));
        result.insert("prompt".to_string(), Value::from(prompt));
        result.insert("style".to_string(), Value::from(style));
        result.insert("dimensions".to_string(), Value::Object(dimensions));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }
}

pub struct MusicGenerationExecutor {
    service: Arc<dyn MusicService>,
}

impl MusicGenerationExecutor {
    pub fn new(service: Arc<dyn MusicService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl NodeExecutor for MusicGenerationExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::MusicGeneration
    }

    async fn execute(
        &self,
        node: &WorkflowNode,
        ctx: &NodeContext,
    ) -> Result<HashMap<String, Value>, NodeError> {
        let description = config_or_context_text(node, ctx, "description");
        let duration = node.config_u64("duration", 10);
        let style = node.config_str("style").unwrap_or("ambient").to_string();

        let request = MusicRequest {
            description: description.clone(),
            duration,
            temperature: node.config_f64("temperature", 1.0),
            style: style.clone(),
        };
        let response = call(ctx, self.service.generate_music(request)).await?;

        let mut result = HashMap::new();
        result.insert("audio_url".to_string(), Value::from(response.audio));
        result.insert("description".to_string(), Value::from(description));
        result.insert("duration".to_string(), Value::from(duration as i64));
        result.insert("style".to_string(), Value::from(style));
        result.insert("metadata".to_string(), Value::Object(response.metadata));
        Ok(result)
    }
}

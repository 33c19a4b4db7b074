//! Generation and publishing backends consumed by the built-in executors
//!
//! Each trait is the seam to one external capability. The engine never talks
//! to a backend directly; executors translate node config and context into a
//! request and the response back into context keys.

use crate::echo::EchoBackend;
use async_trait::async_trait;
use contentcore::{NodeContext, NodeError, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("{service} backend unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} backend rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },
}

impl From<ServiceError> for NodeError {
    fn from(e: ServiceError) -> Self {
        NodeError::ExecutionFailed(e.to_string())
    }
}

/// Await a backend call unless the execution is cancelled first
pub(crate) async fn call<T>(
    ctx: &NodeContext,
    request: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, NodeError> {
    tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        response = request => response.map_err(NodeError::from),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    pub max_length: u64,
    pub temperature: f64,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: String,
    pub width: u64,
    pub height: u64,
    pub num_inference_steps: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageResponse {
    /// URL or data URI of the generated image
    pub image: String,
    pub width: u64,
    pub height: u64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicRequest {
    pub description: String,
    /// Clip length in seconds
    pub duration: u64,
    pub temperature: f64,
    pub style: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusicResponse {
    pub audio: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    pub analysis_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub theme: String,
    pub mood: String,
    pub keywords: Vec<String>,
    pub sentiment: String,
    pub topics: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Default for AnalysisResponse {
    fn default() -> Self {
        Self {
            theme: String::new(),
            mood: String::new(),
            keywords: Vec::new(),
            sentiment: "neutral".to_string(),
            topics: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

/// Material gathered from the context for optimization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    pub title: String,
    pub text: String,
    pub image_url: String,
    pub audio_url: String,
    pub theme: String,
    pub mood: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub content: ContentBundle,
    pub platform: String,
    pub optimization_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub tips: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// A post ready to go out to one platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishContent {
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub audio_url: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub platform_config: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub platform: String,
    pub content: PublishContent,
    pub user_id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub post_id: String,
    pub post_url: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, ServiceError>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, ServiceError>;
}

#[async_trait]
pub trait MusicService: Send + Sync {
    async fn generate_music(&self, request: MusicRequest) -> Result<MusicResponse, ServiceError>;
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ServiceError>;
}

#[async_trait]
pub trait OptimizationService: Send + Sync {
    async fn optimize(
        &self,
        request: OptimizationRequest,
    ) -> Result<OptimizationResponse, ServiceError>;
}

#[async_trait]
pub trait PublishService: Send + Sync {
    async fn publish(&self, request: PublishRequest) -> Result<PublishResponse, ServiceError>;
}

/// The set of backends handed to `register_all`
#[derive(Clone)]
pub struct Services {
    pub text: Arc<dyn TextService>,
    pub image: Arc<dyn ImageService>,
    pub music: Arc<dyn MusicService>,
    pub analysis: Arc<dyn AnalysisService>,
    pub optimization: Arc<dyn OptimizationService>,
    pub publish: Arc<dyn PublishService>,
}

impl Services {
    /// Use one backend for every capability
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TextService
            + ImageService
            + MusicService
            + AnalysisService
            + OptimizationService
            + PublishService
            + 'static,
    {
        Self {
            text: backend.clone(),
            image: backend.clone(),
            music: backend.clone(),
            analysis: backend.clone(),
            optimization: backend.clone(),
            publish: backend,
        }
    }

    /// Offline backend for every capability
    pub fn echo() -> Self {
        Self::from_backend(Arc::new(EchoBackend::new()))
    }

    pub fn with_text(mut self, text: Arc<dyn TextService>) -> Self {
        self.text = text;
        self
    }

    pub fn with_image(mut self, image: Arc<dyn ImageService>) -> Self {
        self.image = image;
        self
    }

    pub fn with_music(mut self, music: Arc<dyn MusicService>) -> Self {
        self.music = music;
        self
    }

    pub fn with_analysis(mut self, analysis: Arc<dyn AnalysisService>) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_optimization(mut self, optimization: Arc<dyn OptimizationService>) -> Self {
        self.optimization = optimization;
        self
    }

    pub fn with_publish(mut self, publish: Arc<dyn PublishService>) -> Self {
        self.publish = publish;
        self
    }
}

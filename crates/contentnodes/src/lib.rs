//! Standard node library
//!
//! Built-in executors for every node type except `loop`, the backend traits
//! the generation and publishing executors call, an offline echo backend and
//! the predefined workflow templates.

mod condition;
mod content;
mod echo;
pub mod expression;
mod generation;
mod io;
pub mod services;
pub mod templates;

pub use condition::ConditionExecutor;
pub use content::{ContentAnalysisExecutor, ContentOptimizationExecutor, PlatformPublishExecutor};
pub use echo::EchoBackend;
pub use generation::{ImageGenerationExecutor, MusicGenerationExecutor, TextGenerationExecutor};
pub use io::{InputExecutor, MergeExecutor, OutputExecutor};
pub use services::{ServiceError, Services};

use contentruntime::ExecutorRegistry;
use std::sync::Arc;

/// Register all standard executors with a registry
pub fn register_all(registry: &mut ExecutorRegistry, services: &Services) {
    registry.register(Arc::new(InputExecutor));
    registry.register(Arc::new(OutputExecutor));
    registry.register(Arc::new(MergeExecutor));
    registry.register(Arc::new(ConditionExecutor));
    registry.register(Arc::new(TextGenerationExecutor::new(services.text.clone())));
    registry.register(Arc::new(ImageGenerationExecutor::new(services.image.clone())));
    registry.register(Arc::new(MusicGenerationExecutor::new(services.music.clone())));
    registry.register(Arc::new(ContentAnalysisExecutor::new(
        services.analysis.clone(),
    )));
    registry.register(Arc::new(ContentOptimizationExecutor::new(
        services.optimization.clone(),
    )));
    registry.register(Arc::new(PlatformPublishExecutor::new(
        services.publish.clone(),
    )));
}

/// A registry holding every standard executor
pub fn standard_registry(services: &Services) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry, services);
    registry
}

use async_trait::async_trait;
use contentcore::{
    ExecutionId, ExecutionStatus, NodeType, ValidationError, Value, WorkflowDefinition,
    WorkflowExecution, WorkflowNode,
};
use contentnodes::services::{
    AnalysisRequest, AnalysisResponse, AnalysisService, ImageRequest, ImageResponse,
    ImageService, MusicRequest, MusicResponse, MusicService, OptimizationRequest,
    OptimizationResponse, OptimizationService, ServiceError, TextRequest, TextResponse,
    TextService,
};
use contentnodes::{standard_registry, templates, EchoBackend, Services};
use contentruntime::{EngineConfig, WorkflowEngine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, timeout, Duration};

/// Records every prompt and answers with a fixed string
#[derive(Default)]
struct RecordingText {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextService for RecordingText {
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, ServiceError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(TextResponse {
            text: format!("Greeting for: {}", request.prompt),
            metadata: HashMap::new(),
        })
    }
}

#[derive(Default)]
struct RecordingImage {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageService for RecordingImage {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, ServiceError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(ImageResponse {
            image: "mem://image.png".to_string(),
            width: request.width,
            height: request.height,
            metadata: HashMap::new(),
        })
    }
}

struct DownText;

#[async_trait]
impl TextService for DownText {
    async fn generate_text(&self, _request: TextRequest) -> Result<TextResponse, ServiceError> {
        Err(ServiceError::Unavailable {
            service: "text",
            message: "connection refused".to_string(),
        })
    }
}

/// Fixed answers for music, analysis and optimization
struct Canned;

#[async_trait]
impl MusicService for Canned {
    async fn generate_music(&self, request: MusicRequest) -> Result<MusicResponse, ServiceError> {
        Ok(MusicResponse {
            audio: format!("canned://{}", request.style),
            ..Default::default()
        })
    }
}

#[async_trait]
impl AnalysisService for Canned {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<AnalysisResponse, ServiceError> {
        Ok(AnalysisResponse {
            theme: "canned theme".to_string(),
            sentiment: "positive".to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl OptimizationService for Canned {
    async fn optimize(
        &self,
        request: OptimizationRequest,
    ) -> Result<OptimizationResponse, ServiceError> {
        Ok(OptimizationResponse {
            title: format!("canned for {}", request.platform),
            ..Default::default()
        })
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn engine_with(services: Services) -> WorkflowEngine {
    init_tracing();
    WorkflowEngine::with_registry(
        Arc::new(standard_registry(&services)),
        EngineConfig::default(),
    )
}

fn input(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

async fn wait_terminal(engine: &WorkflowEngine, id: ExecutionId) -> WorkflowExecution {
    timeout(Duration::from_secs(5), async {
        loop {
            let exec = engine.get_execution_status(id).await.unwrap();
            if exec.status.is_terminal() {
                return exec;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("execution did not reach a terminal state")
}

#[tokio::test]
async fn test_greeting_workflow_end_to_end() {
    let text = Arc::new(RecordingText::default());
    let engine = engine_with(Services::echo().with_text(text.clone()));

    let def = WorkflowDefinition::new("greeting", "Greeting")
        .with_node(WorkflowNode::new("A", NodeType::Input, "A"))
        .with_node(
            WorkflowNode::new("B", NodeType::TextGeneration, "B").with_config("prompt", "Hello {name}"),
        )
        .with_node(WorkflowNode::new("C", NodeType::Output, "C"))
        .with_edge("A", "B")
        .with_edge("B", "C");
    engine.create_workflow(def).await.unwrap();

    let id = engine
        .execute_workflow("greeting", input(&[("name", "Ada")]))
        .await
        .unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Completed, "{:?}", exec.error);
    assert_eq!(text.prompts.lock().unwrap().as_slice(), ["Hello Ada".to_string()]);

    let out = &exec.output_data;
    assert_eq!(out["name"], Value::from("Ada"));
    assert_eq!(out["prompt"], Value::from("Hello Ada"));
    assert_eq!(out["text"], Value::from("Greeting for: Hello Ada"));
    assert_eq!(out["model"], Value::from("default"));

    let b_result = exec.node("B").unwrap().result.clone().unwrap();
    for (key, value) in &b_result {
        assert_eq!(&out[key], value);
    }
    let output = out["output"].as_object().unwrap();
    assert_eq!(output["text"], Value::from("Greeting for: Hello Ada"));
}

#[tokio::test]
async fn test_image_prompt_falls_back_to_context_text() {
    let image = Arc::new(RecordingImage::default());
    let engine = engine_with(Services::echo().with_image(image.clone()));

    let def = WorkflowDefinition::new("illustrate", "Illustrate")
        .with_node(
            WorkflowNode::new("write", NodeType::TextGeneration, "Write")
                .with_config("prompt", "A lighthouse at dusk"),
        )
        .with_node(WorkflowNode::new("draw", NodeType::ImageGeneration, "Draw"))
        .with_edge("write", "draw");
    engine.create_workflow(def).await.unwrap();

    let id = engine.execute_workflow("illustrate", HashMap::new()).await.unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(
        image.prompts.lock().unwrap().as_slice(),
        ["[default] A lighthouse at dusk".to_string()]
    );
    assert_eq!(exec.output_data["image_url"], Value::from("mem://image.png"));
    assert_eq!(exec.output_data["style"], Value::from("realistic"));
}

#[tokio::test]
async fn test_condition_node_reports_path() {
    let engine = engine_with(Services::echo());

    let def = WorkflowDefinition::new("gate", "Gate")
        .with_node(
            WorkflowNode::new("analyze", NodeType::ContentAnalysis, "Analyze")
                .with_config("content", "{draft}"),
        )
        .with_node(
            WorkflowNode::new("gate", NodeType::Condition, "Gate")
                .with_config("condition", "sentiment == 'positive' and {likes} > 10"),
        )
        .with_edge("analyze", "gate");
    engine.create_workflow(def).await.unwrap();

    let mut data = input(&[("draft", "What a great and happy launch")]);
    data.insert("likes".to_string(), Value::from(42i64));
    let id = engine.execute_workflow("gate", data).await.unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.output_data["sentiment"], Value::from("positive"));
    assert_eq!(exec.output_data["condition_result"], Value::Bool(true));
    assert_eq!(exec.output_data["next_path"], Value::from("true"));
}

#[tokio::test]
async fn test_condition_error_does_not_fail_run() {
    let engine = engine_with(Services::echo());

    let def = WorkflowDefinition::new("gate", "Gate").with_node(
        WorkflowNode::new("gate", NodeType::Condition, "Gate").with_config("condition", "views > 3"),
    );
    engine.create_workflow(def).await.unwrap();

    let id = engine
        .execute_workflow("gate", input(&[("views", "many")]))
        .await
        .unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.output_data["next_path"], Value::from("false"));
    assert!(exec.output_data["error"]
        .as_str()
        .unwrap()
        .contains("Unsupported operand types"));
}

#[tokio::test]
async fn test_backend_failure_fails_execution() {
    let engine = engine_with(Services::echo().with_text(Arc::new(DownText)));

    let def = WorkflowDefinition::new("down", "Down").with_node(
        WorkflowNode::new("t", NodeType::TextGeneration, "T").with_config("prompt", "hi"),
    );
    engine.create_workflow(def).await.unwrap();

    let id = engine.execute_workflow("down", HashMap::new()).await.unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert!(exec
        .error
        .unwrap()
        .contains("text backend unavailable: connection refused"));
}

#[tokio::test]
async fn test_cancel_interrupts_slow_backend() {
    let backend = Arc::new(EchoBackend::new().with_latency(Duration::from_secs(30)));
    let engine = engine_with(Services::from_backend(backend));

    let def = WorkflowDefinition::new("slow", "Slow").with_node(
        WorkflowNode::new("m", NodeType::MusicGeneration, "M").with_config("description", "rain"),
    );
    engine.create_workflow(def).await.unwrap();

    let id = engine.execute_workflow("slow", HashMap::new()).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(engine.cancel_execution(id).await);

    let exec = wait_terminal(&engine, id).await;
    assert_eq!(exec.status, ExecutionStatus::Cancelled);
    timeout(Duration::from_secs(2), engine.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_builtin_config_validation() {
    let engine = engine_with(Services::echo());

    let no_prompt = WorkflowDefinition::new("a", "A")
        .with_node(WorkflowNode::new("t", NodeType::TextGeneration, "T"));
    assert!(matches!(
        engine.create_workflow(no_prompt).await,
        Err(ValidationError::InvalidNodeConfig { node_type: NodeType::TextGeneration, .. })
    ));

    let no_platform = WorkflowDefinition::new("b", "B")
        .with_node(WorkflowNode::new("p", NodeType::PlatformPublish, "P"));
    assert!(engine.create_workflow(no_platform).await.is_err());

    let bad_condition = WorkflowDefinition::new("c", "C").with_node(
        WorkflowNode::new("c", NodeType::Condition, "C").with_config("condition", "os.system('x')"),
    );
    assert!(engine.create_workflow(bad_condition).await.is_err());

    let ok = WorkflowDefinition::new("d", "D")
        .with_node(WorkflowNode::new("i", NodeType::ImageGeneration, "I"))
        .with_node(WorkflowNode::new("m", NodeType::MusicGeneration, "M"));
    assert!(engine.create_workflow(ok).await.is_ok());
}

#[tokio::test]
async fn test_services_override_each_backend() {
    let canned = Arc::new(Canned);
    let engine = engine_with(
        Services::echo()
            .with_music(canned.clone())
            .with_analysis(canned.clone())
            .with_optimization(canned),
    );

    let workflow = WorkflowDefinition::new("overrides", "Overrides")
        .with_node(WorkflowNode::new("music", NodeType::MusicGeneration, "Music"))
        .with_node(
            WorkflowNode::new("analyze", NodeType::ContentAnalysis, "Analyze")
                .with_config("content", "some text"),
        )
        .with_node(
            WorkflowNode::new("optimize", NodeType::ContentOptimization, "Optimize")
                .with_config("platform", "blog"),
        )
        .with_edge("music", "optimize")
        .with_edge("analyze", "optimize");
    engine.create_workflow(workflow).await.unwrap();

    let id = engine.execute_workflow("overrides", HashMap::new()).await.unwrap();
    let exec = wait_terminal(&engine, id).await;
    assert_eq!(exec.status, ExecutionStatus::Completed, "{:?}", exec.error);
    assert_eq!(exec.output_data["audio_url"], Value::from("canned://ambient"));
    assert_eq!(exec.output_data["theme"], Value::from("canned theme"));
    assert_eq!(exec.output_data["sentiment"], Value::from("positive"));
    assert_eq!(exec.output_data["optimized_title"], Value::from("canned for blog"));
}

#[tokio::test]
async fn test_deeply_nested_condition_is_rejected() {
    let engine = engine_with(Services::echo());

    let condition = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let nested = WorkflowDefinition::new("nested", "Nested").with_node(
        WorkflowNode::new("c", NodeType::Condition, "C").with_config("condition", condition),
    );
    assert!(matches!(
        engine.create_workflow(nested).await,
        Err(ValidationError::InvalidNodeConfig { node_type: NodeType::Condition, .. })
    ));
    assert!(engine.get_workflow("nested").await.is_err());
}

#[tokio::test]
async fn test_standard_registry_covers_all_but_loop() {
    let engine = engine_with(Services::echo());
    for info in engine.node_types() {
        assert_eq!(info.available, info.node_type != NodeType::Loop, "{}", info.node_type);
    }
}

#[tokio::test]
async fn test_templates_run_with_echo_backend() {
    let engine = engine_with(Services::echo());

    let inputs = [
        (
            "blog_post_workflow",
            input(&[
                ("topic", "tide pools"),
                ("target_audience", "families"),
                ("tone", "warm"),
            ]),
        ),
        (
            "social_media_workflow",
            input(&[("idea", "morning coffee"), ("platform", "weibo"), ("style", "playful")]),
        ),
        (
            "story_creation_workflow",
            input(&[
                ("genre", "mystery"),
                ("main_character", "a retired lighthouse keeper"),
                ("setting", "a foggy harbour"),
                ("conflict", "a ship that vanished"),
            ]),
        ),
        (
            "product_marketing_workflow",
            input(&[
                ("product_name", "Driftwood lamp"),
                ("features", "hand-finished oak"),
                ("target_market", "design lovers"),
                ("unique_selling_points", "each piece is unique"),
            ]),
        ),
    ];

    for (template_id, data) in inputs {
        let def = templates::instantiate_template(template_id).unwrap();
        let workflow_id = engine.create_workflow(def).await.unwrap();
        let id = engine.execute_workflow(&workflow_id, data).await.unwrap();
        let exec = wait_terminal(&engine, id).await;

        assert_eq!(
            exec.status,
            ExecutionStatus::Completed,
            "{} failed: {:?}",
            template_id,
            exec.error
        );
        assert_eq!(exec.execution_log.len(), exec.nodes.len());
    }

    let blog = engine
        .list_workflows()
        .await
        .into_iter()
        .find(|w| w.id.starts_with("blog_post_workflow-"))
        .unwrap();
    let runs = engine.list_executions(&blog.id).await;
    let output = runs[0].output_data["output"].as_object().unwrap().clone();
    for key in ["optimized_content", "image_url", "suggested_tags"] {
        assert!(output.contains_key(key), "blog output missing {}", key);
    }
}

#[tokio::test]
async fn test_social_template_publishes_to_requested_platform() {
    let engine = engine_with(Services::echo());

    let def = templates::instantiate_template("social_media_workflow").unwrap();
    let workflow_id = engine.create_workflow(def).await.unwrap();
    let id = engine
        .execute_workflow(
            &workflow_id,
            input(&[("idea", "rainy days"), ("platform", "weibo"), ("style", "calm")]),
        )
        .await
        .unwrap();
    let exec = wait_terminal(&engine, id).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.output_data["published"], Value::Bool(true));
    assert_eq!(exec.output_data["platform"], Value::from("weibo"));
    assert!(exec.output_data["post_url"]
        .as_str()
        .unwrap()
        .starts_with("echo://weibo/posts/weibo-"));
}

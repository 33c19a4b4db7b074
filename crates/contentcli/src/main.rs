use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use contentcore::{ExecutionStatus, LogStatus, Value, WorkflowDefinition};
use contentnodes::{standard_registry, templates, Services};
use contentruntime::{DependencyGraph, EngineConfig, WorkflowEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "contentflow")]
#[command(about = "Content workflow engine CLI", long_about = None)]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file or a predefined template
    Run {
        /// Path to workflow JSON file
        #[arg(short, long, conflicts_with = "template", required_unless_present = "template")]
        file: Option<PathBuf>,

        /// Template id (see `contentflow templates`)
        #[arg(short, long)]
        template: Option<String>,

        /// Input data as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Timeout for nodes that do not set `timeout_ms`
        #[arg(long, env = "CONTENTFLOW_NODE_TIMEOUT_MS")]
        node_timeout_ms: Option<u64>,

        /// How often to poll the execution status
        #[arg(long, default_value_t = 100)]
        poll_interval_ms: u64,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List node types
    Nodes,

    /// List predefined workflow templates
    Templates,

    /// Write a template to a workflow file
    Init {
        /// Template id to start from
        #[arg(short, long, default_value = "blog_post_workflow")]
        template: String,

        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            file,
            template,
            input,
            node_timeout_ms,
            poll_interval_ms,
        } => {
            let workflow = match (file, template) {
                (Some(file), _) => load_workflow(&file)?,
                (None, Some(id)) => templates::instantiate_template(&id)
                    .ok_or_else(|| anyhow!("Unknown template: {}", id))?,
                (None, None) => bail!("Either --file or --template is required"),
            };

            let mut config = EngineConfig::default();
            if let Some(ms) = node_timeout_ms {
                config = config.with_default_node_timeout(Duration::from_millis(ms));
            }

            run_workflow(
                workflow,
                parse_input(input)?,
                config,
                Duration::from_millis(poll_interval_ms),
            )
            .await?;
        }

        Commands::Validate { file } => {
            validate_workflow(&file).await?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Templates => {
            list_templates();
        }

        Commands::Init { template, output } => {
            create_workflow_file(&template, &output)?;
        }
    }

    Ok(())
}

fn build_engine(config: EngineConfig) -> WorkflowEngine {
    let registry = standard_registry(&Services::echo());
    WorkflowEngine::with_registry(Arc::new(registry), config)
}

fn load_workflow(file: &Path) -> Result<WorkflowDefinition> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let workflow: WorkflowDefinition = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    tracing::debug!("Loaded workflow {} from {}", workflow.id, file.display());
    Ok(workflow)
}

fn parse_input(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(input) = input else {
        return Ok(HashMap::new());
    };

    match serde_json::from_str::<serde_json::Value>(&input)? {
        serde_json::Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()),
        _ => Err(anyhow!("Input must be a JSON object")),
    }
}

async fn run_workflow(
    workflow: WorkflowDefinition,
    input: HashMap<String, Value>,
    config: EngineConfig,
    poll_interval: Duration,
) -> Result<()> {
    println!("🚀 Workflow: {} ({})", workflow.name, workflow.id);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    let engine = build_engine(config);
    let workflow_id = engine.create_workflow(workflow).await?;
    let execution_id = engine.execute_workflow(&workflow_id, input).await?;
    println!("▶️  Execution {} started", execution_id);

    let mut printed = 0;
    let execution = loop {
        let execution = engine.get_execution_status(execution_id).await?;

        for entry in &execution.execution_log[printed..] {
            match entry.status {
                LogStatus::Completed => println!("  ✅ {} ({})", entry.node_name, entry.node_id),
                LogStatus::Failed => println!(
                    "  ❌ {} ({}): {}",
                    entry.node_name,
                    entry.node_id,
                    entry.error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
        printed = execution.execution_log.len();

        if execution.status.is_terminal() {
            break execution;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("⏹️  Cancelling...");
                engine.cancel_execution(execution_id).await;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    };

    let elapsed = execution
        .duration()
        .map(|d| d.num_milliseconds())
        .unwrap_or_default();

    println!();
    match execution.status {
        ExecutionStatus::Completed => {
            println!("✨ Workflow completed in {}ms", elapsed);
            println!();
            println!("📤 Output:");
            println!("{}", serde_json::to_string_pretty(&execution.output_data)?);
            Ok(())
        }
        ExecutionStatus::Cancelled => {
            println!("⏹️  Workflow cancelled after {}ms", elapsed);
            Ok(())
        }
        status => {
            let error = execution.error.unwrap_or_default();
            println!("💥 Workflow {} after {}ms: {}", status, elapsed, error);
            Err(anyhow!("Workflow {}: {}", status, error))
        }
    }
}

async fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    let graph = DependencyGraph::build(&workflow)?;
    let cyclic = graph.has_cycle();

    let name = workflow.name.clone();
    let (nodes, edges) = (workflow.nodes.len(), workflow.edges.len());
    build_engine(EngineConfig::default())
        .create_workflow(workflow)
        .await?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", name);
    println!("   Nodes: {}", nodes);
    println!("   Edges: {}", edges);
    if cyclic {
        println!("⚠️  The graph contains a cycle; executions will stall");
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Node Types:");
    println!();

    let engine = build_engine(EngineConfig::default());
    for info in engine.node_types() {
        let marker = if info.available { "•" } else { "◦" };
        println!("  {} {} ({})", marker, info.node_type, info.category);
        println!("    {}", info.description);
        if !info.available {
            println!("    (no built-in executor)");
        }
    }
}

fn list_templates() {
    println!("🧩 Templates:");
    println!();

    for template in templates::list_templates() {
        println!("  • {} ({} nodes)", template.id, template.node_count);
        println!("    {}", template.description);
        println!(
            "    category: {}, difficulty: {}, estimated time: {}",
            template.category, template.difficulty, template.estimated_time
        );
    }
}

fn create_workflow_file(template_id: &str, output: &Path) -> Result<()> {
    let workflow = templates::get_template(template_id)
        .ok_or_else(|| anyhow!("Unknown template: {}", template_id))?;

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(output, json)?;

    println!("✨ Created workflow from {}: {}", template_id, output.display());
    println!();
    println!("Run it with:");
    println!(
        "  contentflow run --file {} --input '{{\"topic\": \"tide pools\"}}'",
        output.display()
    );

    Ok(())
}

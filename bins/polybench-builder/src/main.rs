mod engine;
mod orchestrator;
mod recipes;
mod repo;

use clap::Parser;
use polybench_common::types::{InstanceDescriptor, Language};
use polybench_common::Config;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "polybench-builder")]
#[command(about = "Build a single PolyBench instance Docker image", long_about = None)]
struct Cli {
    /// Instance ID for the image
    instance_id: String,

    /// Programming language (Java, JavaScript, TypeScript, Python)
    language: String,

    /// Repository name (e.g., google/gson)
    repo: String,

    /// Base commit hash to checkout
    base_commit: String,

    /// Dockerfile content as string
    dockerfile: String,

    /// Base path for repository cloning
    repo_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let language = match Language::from_str(&cli.language) {
        Some(language) => language,
        None => {
            eprintln!("Invalid language: {}", cli.language);
            eprintln!("  Valid options: python, java, javascript, typescript");
            std::process::exit(1);
        }
    };

    let instance = InstanceDescriptor {
        instance_id: cli.instance_id,
        language,
        repo: cli.repo,
        base_commit: cli.base_commit,
        dockerfile: cli.dockerfile,
        repo_path: cli.repo_path,
    };

    let config = Config::from_env();
    debug!(
        docker_host = %config.docker_host,
        timeout_secs = config.docker_timeout_secs,
        "connecting to container engine"
    );

    let engine = engine::DockerEngine::connect(&config)?;
    let repos = repo::GitSource::new();
    let orchestrator = orchestrator::BuildOrchestrator::new(engine, repos);

    let status = orchestrator.run(&instance).await;
    std::process::exit(status);
}

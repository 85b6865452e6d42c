mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polybench-cli")]
#[command(about = "PolyBench CLI - Dataset loading and Dockerfile fixes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset and output each instance as a JSON line
    LoadDataset {
        /// Path to the dataset (JSON lines)
        dataset_path: PathBuf,

        /// Limit number of instances to output (for testing)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip first N instances (for resuming)
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Normalize custom-reporter paths in a Dockerfile
    FixDockerfile {
        /// Dockerfile content as string
        content: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::LoadDataset {
            dataset_path,
            limit,
            offset,
        } => commands::load_dataset(&dataset_path, limit, offset).await,
        Commands::FixDockerfile { content } => commands::fix_dockerfile(&content).await,
    }
}

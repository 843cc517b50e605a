//! Embedding CLI
//!
//! Resolves the configured embedding provider and generates vectors from
//! the command line.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic vectors, no server needed
//! MOCK_EMBEDDINGS=true ./embed text "hello world"
//!
//! # Local Ollama server
//! EMBEDDING_PROVIDER=ollama ./embed text "hello" "world"
//!
//! # Show which model would be used
//! RUST_LOG=debug ./embed --provider openai info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memory_embeddings::{Config, EmbeddingState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "embed")]
#[command(about = "Generate embeddings with the configured provider")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file (default: ./config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the provider (default, openai, ollama)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed one or more texts and print the vectors as JSON
    Text {
        /// Texts to embed, processed in order
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Print name, dimensions and version of the resolved model
    Info,

    /// List registered provider names
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing (stderr, so stdout stays machine-readable)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,memory_embeddings=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(provider) = cli.provider {
        config.embedding.provider = Some(provider);
    }

    let state = EmbeddingState::new(config);

    match cli.command {
        Commands::Text { texts } => run_text(&state, &texts).await,
        Commands::Info => {
            let info = state.service.model_info();
            println!("{}", serde_json::to_string_pretty(info)?);
            Ok(())
        }
        Commands::Providers => {
            for name in state.factory.available_providers() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

async fn run_text(state: &EmbeddingState, texts: &[String]) -> Result<()> {
    let info = state.service.model_info();
    tracing::info!(
        model = %info.name,
        dimensions = info.dimensions,
        count = texts.len(),
        "Generating embeddings"
    );

    let embeddings = state
        .service
        .generate_embeddings(texts)
        .await
        .context("Embedding generation failed")?;

    let output: Vec<serde_json::Value> = texts
        .iter()
        .zip(embeddings)
        .map(|(text, embedding)| serde_json::json!({ "text": text, "embedding": embedding }))
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

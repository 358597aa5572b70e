//! Document Evaluator CLI
//!
//! Runs the gRPC evaluation service, or evaluates a single document locally.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_evaluator::{
    config::Config,
    evaluator::{EvaluationMode, Evaluator, EvaluatorSettings, validation_result_schema},
    llm::LlmClient,
    service::{self, EvaluationService},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Document Evaluator - LLM gatekeeper for RAG knowledge bases
#[derive(Parser)]
#[command(name = "doc-evaluator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gRPC evaluation service
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Evaluate one document against similar documents
    Evaluate {
        /// Path to the document file (text file)
        document: PathBuf,

        /// Files holding similar documents from the knowledge base
        #[arg(short, long = "similar")]
        similar: Vec<PathBuf>,

        /// Evaluation mode: lenient or strict (defaults to config)
        #[arg(short, long)]
        mode: Option<EvaluationMode>,
    },

    /// Print the validation_result JSON schema
    Schema,

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("doc_evaluator=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => cmd_serve(addr).await,
        Commands::Evaluate {
            document,
            similar,
            mode,
        } => cmd_evaluate(document, similar, mode).await,
        Commands::Schema => cmd_schema(),
        Commands::Test => cmd_test().await,
    }
}

/// Load and validate configuration. A missing credential stops startup here.
fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_serve(addr: Option<String>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(addr) = addr {
        config.server.listen_addr = addr;
    }
    let addr = config.server.socket_addr()?;

    let client = Arc::new(LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?);
    let service = EvaluationService::new(client, &config.evaluation);

    service::serve(addr, service, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
    })
    .await
}

async fn cmd_evaluate(
    document_path: PathBuf,
    similar: Vec<PathBuf>,
    mode: Option<EvaluationMode>,
) -> Result<()> {
    let config = load_config()?;
    let mode = mode.unwrap_or(config.evaluation.default_mode);

    let document = std::fs::read_to_string(&document_path)
        .with_context(|| format!("Failed to read document '{}'", document_path.display()))?;
    let retrieved = similar
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read similar document '{}'", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let client = Arc::new(LlmClient::new(config.llm.clone())?);
    let evaluator = Evaluator::new(client, EvaluatorSettings::for_mode(mode, &config.evaluation));

    eprintln!(
        "Evaluating {} ({} similar documents, {} mode, model {})",
        document_path.display(),
        retrieved.len(),
        mode,
        evaluator.settings().model
    );

    let start = Instant::now();
    let verdict = evaluator
        .evaluate(&document, &retrieved)
        .await
        .context("Evaluation failed")?;

    let json = match verdict {
        Some(result) => serde_json::to_string_pretty(&result)?,
        None => "{}".to_string(),
    };
    println!("{}", json);
    eprintln!("Done in {:.2?}", start.elapsed());

    Ok(())
}

fn cmd_schema() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&validation_result_schema())?);
    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;
    let key_prefix: String = config.llm.api_key.chars().take(8).collect();

    println!("Configuration:");
    println!("  API Base:      {}", config.llm.api_base);
    println!("  Lenient model: {}", config.evaluation.lenient_model);
    println!("  Strict model:  {}", config.evaluation.strict_model);
    println!("  Default mode:  {}", config.evaluation.default_mode);
    println!("  API Key:       {}...", key_prefix);
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm)?;

    println!("Sending test request...");
    match client.test_connection(&config.evaluation.strict_model).await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}

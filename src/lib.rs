//! Document Evaluator - decides whether a document belongs in a RAG knowledge base.
//!
//! A candidate document and the similar documents already retrieved from the
//! knowledge base are placed into a fixed evaluation prompt and sent to an
//! OpenAI-compatible chat completion API. The model's JSON verdict
//! (`accept`, `score`, `issues`) is parsed and returned over gRPC.
//!
//! # Quick Start
//!
//! ```no_run
//! use doc_evaluator::{
//!     config::Config,
//!     evaluator::{Evaluator, EvaluatorSettings},
//!     llm::LlmClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let client = Arc::new(LlmClient::new(config.llm.clone())?);
//!     let evaluator = Evaluator::new(client, EvaluatorSettings::strict("gpt-4o"));
//!
//!     let verdict = evaluator
//!         .evaluate("Paris is the capital of France.", &[])
//!         .await?;
//!     println!("{:?}", verdict);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **LlmClient**: OpenAI-compatible chat completion client
//! - **Evaluator**: builds the prompt, calls the model once, reads the verdict
//! - **EvaluationService**: gRPC handler mapping failures to one internal error

pub mod config;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod service;

/// Generated protobuf and gRPC types.
pub mod proto {
    tonic::include_proto!("evaluator");
}

// Re-export commonly used types
pub use config::Config;
pub use error::{EvaluatorError, Result};
pub use evaluator::{EvaluationMode, EvaluationResult, Evaluator, EvaluatorSettings, Issue};
pub use llm::{ChatCompletion, LlmClient};
pub use service::EvaluationService;

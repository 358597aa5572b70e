//! gRPC request handler.
//!
//! Exposes `AppService.GetCompletion`. Input is forwarded to the evaluator
//! as-is. Any failure below is logged here and answered with a single generic
//! internal error; the caller never sees which step failed.

use crate::config::EvaluationConfig;
use crate::error::Result;
use crate::evaluator::{self, EvaluationMode, Evaluator, EvaluatorSettings};
use crate::llm::ChatCompletion;
use crate::proto;
use crate::proto::app_service_server::{AppService, AppServiceServer};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Message returned to callers for every call-time failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to generate completion.";

/// Handler holding one evaluator per mode over a shared client.
#[derive(Clone)]
pub struct EvaluationService {
    lenient: Evaluator,
    strict: Evaluator,
    default_mode: EvaluationMode,
}

impl EvaluationService {
    /// Build both evaluators on top of one client.
    pub fn new(client: Arc<dyn ChatCompletion>, config: &EvaluationConfig) -> Self {
        Self {
            lenient: Evaluator::new(
                client.clone(),
                EvaluatorSettings::for_mode(EvaluationMode::Lenient, config),
            ),
            strict: Evaluator::new(
                client,
                EvaluatorSettings::for_mode(EvaluationMode::Strict, config),
            ),
            default_mode: config.default_mode,
        }
    }

    pub fn default_mode(&self) -> EvaluationMode {
        self.default_mode
    }

    /// The evaluator serving `mode`.
    pub fn evaluator(&self, mode: EvaluationMode) -> &Evaluator {
        match mode {
            EvaluationMode::Lenient => &self.lenient,
            EvaluationMode::Strict => &self.strict,
        }
    }

    /// Resolve the mode a request asked for.
    pub fn resolve_mode(&self, requested: proto::EvaluationMode) -> EvaluationMode {
        match requested {
            proto::EvaluationMode::Lenient => EvaluationMode::Lenient,
            proto::EvaluationMode::Strict => EvaluationMode::Strict,
            proto::EvaluationMode::Unspecified => self.default_mode,
        }
    }

    /// Evaluate one request without the RPC error mapping.
    pub async fn handle(
        &self,
        request: &proto::CompletionRequest,
    ) -> Result<Option<evaluator::EvaluationResult>> {
        let mode = self.resolve_mode(request.mode());
        self.evaluator(mode)
            .evaluate(&request.document, &request.retrieved_similar_documents)
            .await
    }

    /// Wrap into a tonic service.
    pub fn into_server(self) -> AppServiceServer<Self> {
        AppServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl AppService for EvaluationService {
    async fn get_completion(
        &self,
        request: Request<proto::CompletionRequest>,
    ) -> std::result::Result<Response<proto::EvaluationResult>, Status> {
        let request = request.into_inner();

        match self.handle(&request).await {
            Ok(Some(result)) => Ok(Response::new(result.into())),
            Ok(None) => Ok(Response::new(proto::EvaluationResult {
                empty: true,
                ..Default::default()
            })),
            Err(e) => {
                tracing::error!(error = %e, "error generating completion");
                Err(Status::internal(INTERNAL_ERROR_MESSAGE))
            }
        }
    }
}

impl From<evaluator::Issue> for proto::Issue {
    fn from(issue: evaluator::Issue) -> Self {
        Self {
            condition: issue.condition,
            description: issue.description,
            location: issue.location,
        }
    }
}

impl From<evaluator::EvaluationResult> for proto::EvaluationResult {
    fn from(result: evaluator::EvaluationResult) -> Self {
        Self {
            accept: result.accept,
            score: i32::from(result.score),
            issues: result.issues.into_iter().map(Into::into).collect(),
            empty: false,
        }
    }
}

/// Run the gRPC server until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, service: EvaluationService, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    tracing::info!(%addr, default_mode = %service.default_mode(), "gRPC server listening");

    tonic::transport::Server::builder()
        .add_service(service.into_server())
        .serve_with_shutdown(addr, shutdown)
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}

//! Document evaluation against an existing knowledge base.
//!
//! One [`Evaluator`] type covers both evaluation modes; the mode only changes
//! the request settings and how the model's reply is read:
//!
//! - **Lenient**: free-form JSON in the message text, read forgivingly.
//!   A reply without content is treated as the empty verdict.
//! - **Strict**: the request carries the `validation_result` JSON schema and
//!   the reply must match it exactly.

mod schema;
mod verdict;

pub use schema::{VALIDATION_RESULT_SCHEMA_NAME, validation_result_schema};
pub use verdict::{EvaluationResult, Issue, MAX_SCORE, parse_lenient, parse_strict};

use crate::config::EvaluationConfig;
use crate::error::{EvaluatorError, Result};
use crate::llm::{ChatCompletion, ChatRequest, ChatResponse, Message, Prompts, ResponseFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// How the model is asked for, and held to, its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Free-form JSON, forgiving parse.
    Lenient,
    /// Schema-constrained JSON.
    #[default]
    Strict,
}

impl FromStr for EvaluationMode {
    type Err = EvaluatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(EvaluationMode::Lenient),
            "strict" => Ok(EvaluationMode::Strict),
            other => Err(EvaluatorError::InvalidConfig(format!(
                "unknown evaluation mode '{}' (expected 'lenient' or 'strict')",
                other
            ))),
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationMode::Lenient => write!(f, "lenient"),
            EvaluationMode::Strict => write!(f, "strict"),
        }
    }
}

/// Request settings for one evaluation mode.
#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    /// Parse policy for the reply.
    pub mode: EvaluationMode,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature, if any.
    pub temperature: Option<f32>,
    /// Completion token cap, if any.
    pub max_tokens: Option<u32>,
    /// Structured output contract, if any.
    pub response_format: Option<ResponseFormat>,
    /// Enclose the knowledge base in `<<` `>>` like the document.
    pub delimit_knowledge_base: bool,
}

impl EvaluatorSettings {
    /// Free-form evaluation: deterministic sampling and a 500 token cap.
    pub fn lenient(model: impl Into<String>) -> Self {
        Self {
            mode: EvaluationMode::Lenient,
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: Some(500),
            response_format: None,
            delimit_knowledge_base: false,
        }
    }

    /// Schema-constrained evaluation.
    pub fn strict(model: impl Into<String>) -> Self {
        Self {
            mode: EvaluationMode::Strict,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            response_format: Some(ResponseFormat::json_schema(
                VALIDATION_RESULT_SCHEMA_NAME,
                validation_result_schema(),
                true,
            )),
            delimit_knowledge_base: true,
        }
    }

    /// Settings for `mode` using the models named in `config`.
    pub fn for_mode(mode: EvaluationMode, config: &EvaluationConfig) -> Self {
        match mode {
            EvaluationMode::Lenient => Self::lenient(&config.lenient_model),
            EvaluationMode::Strict => Self::strict(&config.strict_model),
        }
    }
}

/// Asks the model whether a document belongs in the knowledge base.
#[derive(Clone)]
pub struct Evaluator {
    client: Arc<dyn ChatCompletion>,
    settings: EvaluatorSettings,
}

impl Evaluator {
    /// Create an evaluator over a shared completion client.
    pub fn new(client: Arc<dyn ChatCompletion>, settings: EvaluatorSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }

    pub fn mode(&self) -> EvaluationMode {
        self.settings.mode
    }

    /// Build the completion request for a document.
    pub fn build_request(&self, document: &str, retrieved_similar_documents: &[String]) -> ChatRequest {
        let prompt = Prompts::document_evaluation(
            document,
            retrieved_similar_documents,
            self.settings.delimit_knowledge_base,
        );

        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::system(prompt)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: self.settings.response_format.clone(),
        }
    }

    /// Evaluate a document.
    ///
    /// Issues exactly one completion call. `Ok(None)` is the empty verdict,
    /// which only the lenient mode produces.
    #[tracing::instrument(
        name = "evaluate",
        skip_all,
        fields(mode = %self.settings.mode, model = %self.settings.model, similar = retrieved_similar_documents.len())
    )]
    pub async fn evaluate(
        &self,
        document: &str,
        retrieved_similar_documents: &[String],
    ) -> Result<Option<EvaluationResult>> {
        let request = self.build_request(document, retrieved_similar_documents);

        let start = Instant::now();
        let response = self.client.chat(request).await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "token usage"
            );
        }

        let verdict = self.read_verdict(response)?;

        match &verdict {
            Some(result) => tracing::info!(
                elapsed_ms,
                accept = result.accept,
                score = result.score,
                issues = result.issues.len(),
                "document evaluated"
            ),
            None => tracing::warn!(elapsed_ms, "model returned no content; empty verdict"),
        }

        Ok(verdict)
    }

    fn read_verdict(&self, response: ChatResponse) -> Result<Option<EvaluationResult>> {
        match self.settings.mode {
            EvaluationMode::Lenient => match response.content {
                Some(content) if !content.trim().is_empty() => parse_lenient(&content),
                _ => Ok(None),
            },
            EvaluationMode::Strict => {
                if let Some(refusal) = response.refusal {
                    return Err(EvaluatorError::LlmApi(format!("model refused: {}", refusal)));
                }
                match response.content {
                    Some(content) if !content.trim().is_empty() => parse_strict(&content).map(Some),
                    _ => Err(EvaluatorError::EmptyResponse),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a canned reply and records every request.
    struct CannedClient {
        reply: Result<ChatResponse>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl CannedClient {
        fn content(content: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(ChatResponse {
                    content: content.map(str::to_string),
                    ..Default::default()
                }),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(EvaluatorError::Http("connection refused".to_string())),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for CannedClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(EvaluatorError::Http(e.to_string())),
            }
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("lenient".parse::<EvaluationMode>().unwrap(), EvaluationMode::Lenient);
        assert_eq!(" STRICT ".parse::<EvaluationMode>().unwrap(), EvaluationMode::Strict);
        assert!("loose".parse::<EvaluationMode>().is_err());
        assert_eq!(EvaluationMode::Lenient.to_string(), "lenient");
    }

    #[test]
    fn test_lenient_request_settings() {
        let evaluator = Evaluator::new(CannedClient::content(None), EvaluatorSettings::lenient("gpt-3.5-turbo"));
        let request = evaluator.build_request("Paris is the capital of France.", &[]);

        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(500));
        assert!(request.response_format.is_none());
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("<<Paris is the capital of France.>>"));
    }

    #[test]
    fn test_strict_request_settings() {
        let evaluator = Evaluator::new(CannedClient::content(None), EvaluatorSettings::strict("gpt-4o"));
        let request = evaluator.build_request("doc", &["kb entry".to_string()]);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "validation_result");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert!(body.get("max_tokens").is_none());
        assert!(request.messages[0].content.contains("<<kb entry>>"));
    }

    #[tokio::test]
    async fn test_lenient_missing_content_is_empty_verdict() {
        let client = CannedClient::content(None);
        let evaluator = Evaluator::new(client.clone(), EvaluatorSettings::lenient("gpt-3.5-turbo"));

        let verdict = evaluator.evaluate("doc", &[]).await.unwrap();
        assert!(verdict.is_none());
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_strict_missing_content_is_an_error() {
        let evaluator = Evaluator::new(CannedClient::content(None), EvaluatorSettings::strict("gpt-4o"));
        let err = evaluator.evaluate("doc", &[]).await.unwrap_err();
        assert!(matches!(err, EvaluatorError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_strict_refusal_is_an_error() {
        let client = Arc::new(CannedClient {
            reply: Ok(ChatResponse {
                refusal: Some("I can't help with that.".to_string()),
                ..Default::default()
            }),
            requests: Mutex::new(Vec::new()),
        });
        let evaluator = Evaluator::new(client, EvaluatorSettings::strict("gpt-4o"));
        let err = evaluator.evaluate("doc", &[]).await.unwrap_err();
        assert!(matches!(err, EvaluatorError::LlmApi(_)));
    }

    #[tokio::test]
    async fn test_verdict_returned_unchanged() {
        let reply = r#"{"accept": true, "score": 95, "issues": []}"#;
        for settings in [EvaluatorSettings::lenient("a"), EvaluatorSettings::strict("b")] {
            let evaluator = Evaluator::new(CannedClient::content(Some(reply)), settings);
            let verdict = evaluator
                .evaluate("Paris is the capital of France.", &[])
                .await
                .unwrap()
                .unwrap();
            assert_eq!(
                verdict,
                EvaluationResult {
                    accept: true,
                    score: 95,
                    issues: vec![]
                }
            );
        }
    }

    #[tokio::test]
    async fn test_client_failure_propagates() {
        let client = CannedClient::failing();
        let evaluator = Evaluator::new(client.clone(), EvaluatorSettings::lenient("gpt-3.5-turbo"));
        let err = evaluator.evaluate("doc", &[]).await.unwrap_err();
        assert!(matches!(err, EvaluatorError::Http(_)));
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_settings_follow_config_models() {
        let config = EvaluationConfig {
            lenient_model: "legacy".to_string(),
            strict_model: "modern".to_string(),
            ..Default::default()
        };
        assert_eq!(EvaluatorSettings::for_mode(EvaluationMode::Lenient, &config).model, "legacy");
        assert_eq!(EvaluatorSettings::for_mode(EvaluationMode::Strict, &config).model, "modern");
    }
}

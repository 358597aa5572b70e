//! Error types for the document evaluator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvaluatorError>;

/// Errors that can occur while configuring or running an evaluation.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error or missing required setting.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// The model answered, but the verdict breaks the output contract.
    #[error("Verdict violates the validation_result schema: {0}")]
    SchemaViolation(String),

    /// The model returned no message content.
    #[error("LLM returned an empty message")]
    EmptyResponse,

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl EvaluatorError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for EvaluatorError {
    fn from(err: reqwest::Error) -> Self {
        EvaluatorError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvaluatorError {
    fn from(err: serde_json::Error) -> Self {
        EvaluatorError::LlmParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = EvaluatorError::io(
            "/tmp/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.txt"));
    }

    #[test]
    fn test_serde_error_maps_to_parse() {
        let err: EvaluatorError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, EvaluatorError::LlmParse(_)));
    }
}

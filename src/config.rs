//! Configuration for the evaluator service.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.
//!
//! The configuration is loaded once at process start and passed into the
//! components that need it; nothing reads the environment after startup.

use crate::error::{EvaluatorError, Result};
use crate::evaluator::EvaluationMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable holding the completion API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key for authentication
    #[serde(default)]
    pub api_key: String,

    /// Transport timeout in seconds. `None` keeps the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

/// gRPC server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the gRPC server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:50051".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl ServerConfig {
    /// Parse the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            EvaluatorError::InvalidConfig(format!(
                "listen address '{}' is not valid: {}",
                self.listen_addr, e
            ))
        })
    }
}

/// Which evaluation modes exist and which one a request gets by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Mode used when the caller does not ask for one.
    #[serde(default)]
    pub default_mode: EvaluationMode,

    /// Model for free-form (lenient) evaluations.
    #[serde(default = "default_lenient_model")]
    pub lenient_model: String,

    /// Model for schema-constrained (strict) evaluations.
    #[serde(default = "default_strict_model")]
    pub strict_model: String,
}

fn default_lenient_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_strict_model() -> String {
    "gpt-4o".to_string()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_mode: EvaluationMode::default(),
            lenient_model: default_lenient_model(),
            strict_model: default_strict_model(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// gRPC server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Evaluation modes
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (OPENAI_API_KEY, OPENAI_API_BASE, EVALUATOR_*)
    /// 2. Config file (~/.config/doc-evaluator/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_overrides(|key| env::var(key).ok())?;

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvaluatorError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| EvaluatorError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply overrides from a key lookup, normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup(API_KEY_ENV) {
            self.llm.api_key = api_key;
        }

        if let Some(api_base) = lookup("OPENAI_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(timeout) = lookup("OPENAI_TIMEOUT_SECS") {
            let secs = timeout.trim().parse().map_err(|e| {
                EvaluatorError::InvalidConfig(format!(
                    "OPENAI_TIMEOUT_SECS '{}' is not a whole number of seconds: {}",
                    timeout, e
                ))
            })?;
            self.llm.timeout_secs = Some(secs);
        }

        if let Some(addr) = lookup("EVALUATOR_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }

        if let Some(mode) = lookup("EVALUATOR_MODE") {
            self.evaluation.default_mode = mode.parse()?;
        }

        if let Some(model) = lookup("EVALUATOR_LENIENT_MODEL") {
            self.evaluation.lenient_model = model;
        }

        if let Some(model) = lookup("EVALUATOR_STRICT_MODEL") {
            self.evaluation.strict_model = model;
        }

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "doc-evaluator")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(EvaluatorError::Config(format!(
                "API key is missing. Set {} in the environment or add llm.api_key to the config file.",
                API_KEY_ENV
            )));
        }

        if self.llm.api_base.is_empty() {
            return Err(EvaluatorError::Config(
                "LLM API base URL is required. Set OPENAI_API_BASE or add to config file."
                    .to_string(),
            ));
        }

        if self.evaluation.lenient_model.is_empty() || self.evaluation.strict_model.is_empty() {
            return Err(EvaluatorError::Config(
                "Evaluation model names must not be empty.".to_string(),
            ));
        }

        self.server.socket_addr()?;

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.server.listen_addr, "0.0.0.0:50051");
        assert_eq!(config.evaluation.default_mode, EvaluationMode::Strict);
        assert_eq!(config.evaluation.lenient_model, "gpt-3.5-turbo");
        assert_eq!(config.evaluation.strict_model, "gpt-4o");
    }

    #[test]
    fn test_validate_fails_without_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_validate_rejects_bad_listen_addr() {
        let mut config = Config::with_llm("https://api.example.com", "sk-test");
        config.server.listen_addr = "not-an-address".to_string();
        assert!(matches!(
            config.validate(),
            Err(EvaluatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("OPENAI_API_BASE", "http://localhost:8080"),
                ("OPENAI_TIMEOUT_SECS", "30"),
                ("EVALUATOR_MODE", "lenient"),
                ("EVALUATOR_STRICT_MODEL", "gpt-4o-mini"),
            ]))
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-env");
        assert_eq!(config.llm.api_base, "http://localhost:8080");
        assert_eq!(config.llm.timeout_secs, Some(30));
        assert_eq!(config.evaluation.default_mode, EvaluationMode::Lenient);
        assert_eq!(config.evaluation.strict_model, "gpt-4o-mini");
        assert_eq!(config.evaluation.lenient_model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup_from(&[("EVALUATOR_MODE", "fuzzy")]));
        assert!(matches!(result, Err(EvaluatorError::InvalidConfig(_))));

        let mut config = Config::default();
        let result = config.apply_overrides(lookup_from(&[("OPENAI_TIMEOUT_SECS", "30s")]));
        assert!(matches!(result, Err(EvaluatorError::InvalidConfig(_))));
        assert_eq!(config.llm.timeout_secs, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "llm:\n  api_key: sk-file\nserver:\n  listen_addr: 127.0.0.1:6000\nevaluation:\n  default_mode: lenient\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.llm.api_key, "sk-file");
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert_eq!(config.server.listen_addr, "127.0.0.1:6000");
        assert_eq!(config.evaluation.default_mode, EvaluationMode::Lenient);
        assert_eq!(config.evaluation.strict_model, "gpt-4o");
    }
}

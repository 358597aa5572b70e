//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for chat completions and
//! the prompt used for document evaluation.

mod client;
mod prompts;

pub use client::{
    ChatCompletion, ChatRequest, ChatResponse, JsonSchemaFormat, LlmClient, Message,
    ResponseFormat, Role, TokenUsage,
};
pub use prompts::{CLOSE_DELIMITER, OPEN_DELIMITER, Prompts};

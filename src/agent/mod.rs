//! LLM client for executing prompts

pub mod client;
pub mod openai;
pub mod response;

use async_trait::async_trait;
pub use client::LlmClientConfig;
pub use openai::OpenAiClient;
pub use response::LlmError;

/// Trait for chat-completion calls - allows for different implementations
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single user prompt and return the raw model text
    async fn call(&self, prompt: &str, api_key: &str, model: &str) -> Result<String, LlmError>;
}

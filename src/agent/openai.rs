//! Chat-completion client over HTTP

use crate::agent::{
    response::{ChatRequest, ChatResponse},
    LlmClient, LlmClientConfig, LlmError,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Client for an OpenAI-style chat-completion endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: LlmClientConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    fn classify(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    /// Send one prompt and return the first choice's content
    ///
    /// # Errors
    /// - `Timeout` when no full response arrives within the configured bound
    /// - `Api` for non-2xx statuses, carrying the response body
    /// - `Network` for any other transport failure
    /// - `InvalidResponse` when a 2xx body has no message content
    async fn call(&self, prompt: &str, api_key: &str, model: &str) -> Result<String, LlmError> {
        debug!(
            endpoint = %self.config.endpoint,
            model,
            prompt_len = prompt.len(),
            "Sending chat-completion request"
        );

        let request = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest::user(model, prompt));

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = timeout(Duration::from_secs(self.config.timeout_secs), exchange)
            .await
            .map_err(|_| LlmError::Timeout(self.config.timeout_secs))?
            .map_err(|e| self.classify(e))?;

        if !status.is_success() {
            warn!("Chat-completion request failed with status {}", status.as_u16());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let content = ChatResponse::first_content(&body)?;
        debug!("Chat-completion returned {} bytes of content", content.len());

        Ok(content)
    }
}

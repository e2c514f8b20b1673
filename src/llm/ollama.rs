//! Ollama chat client.
//!
//! Talks to `POST {base_url}/api/chat` with streaming off. Sampling
//! temperature and keep-alive come from [`LlmConfig`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Connection and sampling settings for one Ollama model.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    /// How long the server keeps the model loaded after a request.
    pub keep_alive: String,
}

impl OllamaConfig {
    /// Settings for `model` with every other field at its default.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::from(&LlmConfig::default())
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&LlmConfig> for OllamaConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
            keep_alive: config.keep_alive.clone(),
        }
    }
}

/// Completion capability backed by a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    http: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::llm(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Returns true if the server answers on `/api/tags`.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        matches!(self.http.get(url).send().await, Ok(resp) if resp.status().is_success())
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            keep_alive: &self.config.keep_alive,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::llm(format!(
                "Ollama did not answer within {}s",
                self.config.timeout.as_secs()
            ))
        } else if e.is_connect() {
            AppError::llm(format!(
                "Failed to connect to Ollama at {}. Is it running?",
                self.config.base_url
            ))
        } else {
            AppError::llm(format!("Request failed: {e}"))
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let start = Instant::now();
        let response = self
            .http
            .post(self.chat_url())
            .json(&self.chat_request(messages))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::llm(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(AppError::llm(format!("Ollama API error ({status}): {body}")));
        }

        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::llm(format!("Unexpected response from Ollama: {e}")))?;

        debug!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis(),
            response_len = reply.message.content.len(),
            "Ollama completion finished"
        );
        Ok(reply.message.content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    keep_alive: &'a str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Message,
}

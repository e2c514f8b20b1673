//! LLM integration.
//!
//! Provides the completion capability trait, the Ollama client, and the
//! SQL generator built on top of them.

pub mod generator;
pub mod mock;
pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod types;

pub use generator::SqlGenerator;
pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaConfig};
pub use parser::strip_code_fences;
pub use prompt::{build_generation_messages, build_summary_messages, GenerationPrompt};
pub use types::{Message, Role};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync): one client is shared
/// by every concurrent workflow run.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// A leading system message is optional.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

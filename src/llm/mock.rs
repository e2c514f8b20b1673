//! Mock LLM client for testing.
//!
//! Provides deterministic responses: queued responses first, then pattern
//! matches on the last user message, then a fixed fallback. Every request is
//! recorded for later inspection.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Response returned when nothing else matches.
pub const FALLBACK_RESPONSE: &str =
    "I don't understand that question. Could you please rephrase it?";

/// Mock LLM client that returns canned responses.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Responses consumed in order, one per call.
    queued: Mutex<VecDeque<Result<String>>>,
    /// Pattern -> response mappings, checked when the queue is empty.
    custom_responses: Vec<(String, String)>,
    /// Every message list received.
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern` (case-insensitive),
    /// the mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Queues a response for the next unanswered call.
    pub fn push_response(self, response: impl Into<String>) -> Self {
        self.lock_queue().push_back(Ok(response.into()));
        self
    }

    /// Queues a failure for the next unanswered call.
    pub fn push_error(self, message: impl Into<String>) -> Self {
        self.lock_queue().push_back(Err(AppError::llm(message)));
        self
    }

    /// Returns every message list received, in order.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the number of completions requested.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generates a response from the custom mappings.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        self.custom_responses
            .iter()
            .find(|(pattern, _)| input_lower.contains(&pattern.to_lowercase()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| FALLBACK_RESPONSE.to_string())
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        if let Some(queued) = self.lock_queue().pop_front() {
            return queued;
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}

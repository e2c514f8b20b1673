//! SQL generation.
//!
//! Turns the current workflow state into a grounded prompt, asks the model
//! for SQL, and strips formatting from the reply. The output is not
//! validated here; the executor decides whether it can run.

use std::sync::Arc;
use std::time::Instant;

use crate::error::WorkflowError;
use crate::llm::parser::strip_code_fences;
use crate::llm::prompt::{build_generation_messages, GenerationPrompt};
use crate::llm::LlmClient;
use crate::workflow::WorkflowState;

/// Generates candidate SQL from a workflow state.
#[derive(Clone)]
pub struct SqlGenerator {
    client: Arc<dyn LlmClient>,
    history_window: usize,
}

impl SqlGenerator {
    pub fn new(client: Arc<dyn LlmClient>, history_window: usize) -> Self {
        Self {
            client,
            history_window,
        }
    }

    /// Asks the model for SQL answering `state.question`.
    ///
    /// The previous error is included only on a retry (error set and
    /// `retry_count > 0`).
    pub async fn generate(&self, state: &WorkflowState) -> Result<String, WorkflowError> {
        let previous_error = state
            .error
            .as_ref()
            .filter(|_| state.retry_count > 0)
            .map(ToString::to_string);

        let messages = build_generation_messages(&GenerationPrompt {
            schema: &state.schema,
            history: &state.chat_history,
            history_window: self.history_window,
            question: &state.question,
            previous_error: previous_error.as_deref(),
        });

        let start = Instant::now();
        let response = self
            .client
            .complete(&messages)
            .await
            .map_err(|e| WorkflowError::Generation(e.message().to_string()))?;

        let sql = strip_code_fences(&response);
        tracing::debug!(
            llm_duration_ms = start.elapsed().as_millis(),
            retry = state.retry_count,
            sql_len = sql.len(),
            "Generated SQL candidate"
        );

        if sql.is_empty() {
            return Err(WorkflowError::Generation(
                "model returned an empty response".to_string(),
            ));
        }

        Ok(sql)
    }
}

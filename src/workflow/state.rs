//! Workflow state and the reducer that applies stage deltas to it.

use crate::error::WorkflowError;

/// `sql_query` value meaning "generation and execution were bypassed".
pub const SKIP_SENTINEL: &str = "SKIP";

/// Record threaded through every stage of one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub question: String,
    pub chat_history: Vec<String>,
    pub schema: String,
    pub sql_query: String,
    pub result: String,
    pub error: Option<WorkflowError>,
    pub retry_count: u32,
}

impl WorkflowState {
    /// Creates the initial state for a question: no error, no retries.
    pub fn new(question: impl Into<String>, chat_history: Vec<String>) -> Self {
        Self {
            question: question.into(),
            chat_history,
            ..Self::default()
        }
    }

    /// Returns a new state with `delta` merged in.
    ///
    /// Fields absent from the delta are kept; present ones overwrite.
    pub fn apply(&self, delta: &StateDelta) -> Self {
        let mut next = self.clone();
        if let Some(schema) = &delta.schema {
            next.schema = schema.clone();
        }
        if let Some(sql) = &delta.sql_query {
            next.sql_query = sql.clone();
        }
        if let Some(result) = &delta.result {
            next.result = result.clone();
        }
        match &delta.error {
            ErrorUpdate::Unchanged => {}
            ErrorUpdate::Clear => next.error = None,
            ErrorUpdate::Set(err) => next.error = Some(err.clone()),
        }
        if let Some(retry_count) = delta.retry_count {
            next.retry_count = retry_count;
        }
        next
    }

    /// Returns true if the current error bypasses retry.
    pub fn has_critical_error(&self) -> bool {
        self.error.as_ref().is_some_and(WorkflowError::is_critical)
    }

    /// Returns true if generation/execution were short-circuited.
    pub fn is_skipped(&self) -> bool {
        self.sql_query == SKIP_SENTINEL
    }
}

/// What a stage does to the `error` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ErrorUpdate {
    #[default]
    Unchanged,
    Clear,
    Set(WorkflowError),
}

/// Partial state produced by a single stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub schema: Option<String>,
    pub sql_query: Option<String>,
    pub result: Option<String>,
    pub error: ErrorUpdate,
    pub retry_count: Option<u32>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn sql_query(mut self, sql: impl Into<String>) -> Self {
        self.sql_query = Some(sql.into());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn error(mut self, error: WorkflowError) -> Self {
        self.error = ErrorUpdate::Set(error);
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = ErrorUpdate::Clear;
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    /// Returns the error this delta sets, if any.
    pub fn set_error(&self) -> Option<&WorkflowError> {
        match &self.error {
            ErrorUpdate::Set(err) => Some(err),
            _ => None,
        }
    }
}

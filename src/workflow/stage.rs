//! Workflow stages and the retry decision.

use std::fmt;

use super::state::{StateDelta, WorkflowState};

/// One step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchingSchema,
    Generating,
    Executing,
    Summarizing,
    Done,
}

impl Stage {
    /// Name reported to the job layer as the progress indicator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchingSchema => "get_schema",
            Self::Generating => "generate_sql",
            Self::Executing => "execute_sql",
            Self::Summarizing => "summarize",
            Self::Done => "done",
        }
    }

    /// Human-readable label for log narration.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchingSchema => "FETCHING SCHEMA",
            Self::Generating => "GENERATING SQL",
            Self::Executing => "EXECUTING SQL",
            Self::Summarizing => "SUMMARIZING",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage together with the delta it produced; one item of the run stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub stage: Stage,
    pub delta: StateDelta,
}

/// Outcome of the conditional edge after a failed or successful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// No error: summarize the rows.
    Success,
    /// Retryable error with budget left: regenerate.
    Retry,
    /// Critical error or retries exhausted: summarize what we have.
    Terminate,
}

impl RetryDecision {
    /// Evaluates the decision for `state` under a `max_retries` cap.
    pub fn evaluate(state: &WorkflowState, max_retries: u32) -> Self {
        match &state.error {
            None => Self::Success,
            Some(err) if err.is_critical() => Self::Terminate,
            Some(_) if state.retry_count < max_retries => Self::Retry,
            Some(_) => Self::Terminate,
        }
    }

    /// The stage the controller dispatches to.
    pub fn next_stage(&self) -> Stage {
        match self {
            Self::Retry => Stage::Generating,
            Self::Success | Self::Terminate => Stage::Summarizing,
        }
    }
}

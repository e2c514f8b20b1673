//! The workflow controller.
//!
//! Drives a question through schema fetch, SQL generation, safe execution
//! and summarization. Each stage reads the current [`WorkflowState`] and
//! returns a [`StateDelta`]; the controller merges deltas and picks the
//! next stage, looping back to generation while the retry budget allows.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::observer::{StageObserver, TracingObserver};
use super::stage::{RetryDecision, Stage, StageUpdate};
use super::state::{StateDelta, WorkflowState, SKIP_SENTINEL};
use crate::config::WorkflowConfig;
use crate::db::DatabaseClient;
use crate::error::{AppError, WorkflowError};
use crate::llm::{build_summary_messages, LlmClient, SqlGenerator};
use crate::query::SqlExecutor;

/// Answer for a run whose database was unreachable.
pub const UNREACHABLE_MESSAGE: &str = "System Error: Database unreachable.";

/// Answer for a run that produced no rows.
pub const NO_DATA_MESSAGE: &str = "No data found.";

/// Final answer of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub result: String,
    pub sql_query: String,
    pub retry_count: u32,
    pub error: Option<WorkflowError>,
}

impl WorkflowOutcome {
    pub fn status(&self) -> RunStatus {
        if self.error.as_ref().is_some_and(WorkflowError::is_critical) {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        }
    }
}

impl From<WorkflowState> for WorkflowOutcome {
    fn from(state: WorkflowState) -> Self {
        Self {
            result: state.result,
            sql_query: state.sql_query,
            retry_count: state.retry_count,
            error: state.error,
        }
    }
}

/// Whether a finished run answered the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Orchestrates one or more workflow runs over shared capabilities.
///
/// Runs share nothing but the capabilities, so a controller can be wrapped
/// in an `Arc` and driven from many tasks at once.
pub struct WorkflowController {
    db: Arc<dyn DatabaseClient>,
    llm: Arc<dyn LlmClient>,
    generator: SqlGenerator,
    executor: SqlExecutor,
    schema_backoff: BackoffPolicy,
    max_retries: u32,
    observer: Arc<dyn StageObserver>,
}

impl WorkflowController {
    pub fn new(
        db: Arc<dyn DatabaseClient>,
        llm: Arc<dyn LlmClient>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(llm.clone(), config.history_window),
            executor: SqlExecutor::new(db.clone(), config.statement_separator),
            schema_backoff: BackoffPolicy::new(config.schema_attempts, config.retry_delay()),
            max_retries: config.max_retries,
            observer: Arc::new(TracingObserver),
            db,
            llm,
        }
    }

    /// Replaces the stage observer.
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the schema fetch backoff.
    pub fn with_schema_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.schema_backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs the workflow, yielding one update per completed stage.
    ///
    /// The stream ends after the summarizing stage.
    pub fn run(
        &self,
        question: String,
        chat_history: Vec<String>,
    ) -> impl Stream<Item = StageUpdate> + Send + '_ {
        let initial = WorkflowState::new(question, chat_history);

        stream::unfold(
            Some((initial, Stage::FetchingSchema)),
            move |cursor| async move {
                let (state, stage) = cursor?;
                self.observer.on_stage(stage);

                let delta = self.run_stage(stage, &state).await;
                let next_state = state.apply(&delta);
                let next = self.next_stage(stage, &delta, &next_state);
                debug!(from = %stage, to = %next, retry_count = next_state.retry_count, "Stage finished");

                let cursor = (next != Stage::Done).then_some((next_state, next));
                Some((StageUpdate { stage, delta }, cursor))
            },
        )
    }

    /// Runs the workflow to the end and returns the final answer.
    pub async fn run_to_completion(
        &self,
        question: String,
        chat_history: Vec<String>,
    ) -> WorkflowOutcome {
        let initial = WorkflowState::new(question.clone(), chat_history.clone());
        let final_state = self
            .run(question, chat_history)
            .fold(initial, |state, update| async move { state.apply(&update.delta) })
            .await;
        WorkflowOutcome::from(final_state)
    }

    async fn run_stage(&self, stage: Stage, state: &WorkflowState) -> StateDelta {
        match stage {
            Stage::FetchingSchema => self.fetch_schema().await,
            Stage::Generating => self.generate(state).await,
            Stage::Executing => self.execute(state).await,
            Stage::Summarizing => self.summarize(state).await,
            Stage::Done => StateDelta::new(),
        }
    }

    fn next_stage(&self, stage: Stage, delta: &StateDelta, state: &WorkflowState) -> Stage {
        match stage {
            Stage::FetchingSchema if state.has_critical_error() => Stage::Summarizing,
            Stage::FetchingSchema => Stage::Generating,
            Stage::Generating => match delta.set_error() {
                Some(WorkflowError::Generation(_)) => {
                    RetryDecision::evaluate(state, self.max_retries).next_stage()
                }
                _ => Stage::Executing,
            },
            Stage::Executing => RetryDecision::evaluate(state, self.max_retries).next_stage(),
            Stage::Summarizing | Stage::Done => Stage::Done,
        }
    }

    async fn fetch_schema(&self) -> StateDelta {
        let fetched = self
            .schema_backoff
            .retry(|attempt| async move {
                match self.db.schema_info().await {
                    Ok(schema) if !schema.trim().is_empty() => Ok(schema),
                    Ok(_) => Err(AppError::connection(format!(
                        "schema attempt {attempt} returned no tables"
                    ))),
                    Err(e) => Err(e),
                }
            })
            .await;

        match fetched {
            Ok(schema) => {
                info!(schema_len = schema.len(), "Schema loaded");
                StateDelta::new()
                    .schema(schema)
                    .retry_count(0)
                    .clear_error()
            }
            Err(e) => {
                error!(
                    attempts = self.schema_backoff.attempts(),
                    error = %e,
                    "Database unreachable, skipping generation"
                );
                StateDelta::new()
                    .schema("")
                    .sql_query(SKIP_SENTINEL)
                    .error(WorkflowError::CriticalConnection)
            }
        }
    }

    async fn generate(&self, state: &WorkflowState) -> StateDelta {
        if state.has_critical_error() {
            return StateDelta::new().sql_query(SKIP_SENTINEL);
        }

        match self.generator.generate(state).await {
            Ok(sql) => {
                info!(sql = %sql, attempt = state.retry_count + 1, "Generated SQL");
                StateDelta::new().sql_query(sql)
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "SQL generation failed");
                StateDelta::new()
                    .error(e)
                    .retry_count(state.retry_count + 1)
            }
        }
    }

    async fn execute(&self, state: &WorkflowState) -> StateDelta {
        if state.is_skipped() {
            // Exhaust the budget so the decision terminates.
            return StateDelta::new().retry_count(self.max_retries);
        }

        match self.executor.execute(&state.sql_query).await {
            Ok(rows) => StateDelta::new()
                .result(rows.to_result_text())
                .clear_error(),
            Err(e) => {
                let retry_count = state.retry_count + 1;
                warn!(kind = e.kind(), error = %e, retry_count, max_retries = self.max_retries, "Execution failed");
                StateDelta::new().error(e).retry_count(retry_count)
            }
        }
    }

    async fn summarize(&self, state: &WorkflowState) -> StateDelta {
        let delta = StateDelta::new().sql_query(state.sql_query.clone());

        if state.has_critical_error() {
            return delta.result(UNREACHABLE_MESSAGE);
        }

        let rows = state.result.trim();
        if rows.is_empty() || rows == "[]" {
            return delta.result(NO_DATA_MESSAGE);
        }

        let messages = build_summary_messages(&state.question, rows);
        match self.llm.complete(&messages).await {
            Ok(answer) => delta.result(answer.trim()),
            Err(e) => {
                warn!(error = %e, "Summarization failed, returning raw rows");
                delta
                    .result(format!("Here is what the database returned: {rows}"))
                    .error(WorkflowError::Generation(e.message().to_string()))
            }
        }
    }
}

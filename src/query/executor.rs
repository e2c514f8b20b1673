//! Safe SQL execution.
//!
//! Normalizes generated SQL, runs it through the safety gate, and only then
//! hands it to the database. Failures are reported, never retried here.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::WorkflowError;
use crate::llm::strip_code_fences;
use crate::safety::{self, SafetyVerdict};

/// Executes generated SQL against the database capability.
#[derive(Clone)]
pub struct SqlExecutor {
    db: Arc<dyn DatabaseClient>,
    separator: char,
}

impl SqlExecutor {
    /// Creates an executor that keeps only the text before `separator`.
    pub fn new(db: Arc<dyn DatabaseClient>, separator: char) -> Self {
        Self { db, separator }
    }

    /// Strips fences and whitespace, then cuts at the first separator.
    ///
    /// Only the first statement is ever executed.
    pub fn normalize(&self, raw_sql: &str) -> String {
        let clean = strip_code_fences(raw_sql);
        match clean.split_once(self.separator) {
            Some((first, _)) => first.trim().to_string(),
            None => clean,
        }
    }

    /// Normalizes, gates, and executes `raw_sql`.
    pub async fn execute(&self, raw_sql: &str) -> Result<QueryResult, WorkflowError> {
        let sql = self.normalize(raw_sql);

        if let SafetyVerdict::Rejected { keyword } = safety::check(&sql) {
            warn!(keyword, sql = %sql, "Blocked data-modifying query");
            return Err(WorkflowError::UnsafeQuery);
        }

        info!(sql = %sql, "Executing SQL");
        let start = Instant::now();

        match self.db.execute_query(&sql).await {
            Ok(result) => {
                info!(
                    duration_ms = start.elapsed().as_millis(),
                    row_count = result.row_count,
                    "Query succeeded"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "SQL execution error");
                Err(WorkflowError::Execution(e.message().to_string()))
            }
        }
    }
}

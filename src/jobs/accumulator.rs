//! Folds stage updates into the fields a job reports.

use crate::error::WorkflowError;
use crate::workflow::StageUpdate;

/// Running view of a workflow as seen by the job layer.
///
/// `sql_query` and `result` take the last value written. `error` keeps the
/// last error that was set and ignores clears, so a failure that happened
/// before a later recovery still surfaces if it was critical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunAccumulator {
    pub sql_query: Option<String>,
    pub result: Option<String>,
    pub error: Option<WorkflowError>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, update: &StageUpdate) {
        let delta = &update.delta;
        if let Some(sql) = &delta.sql_query {
            self.sql_query = Some(sql.clone());
        }
        if let Some(result) = &delta.result {
            self.result = Some(result.clone());
        }
        if let Some(err) = delta.set_error() {
            self.error = Some(err.clone());
        }
    }

    /// Returns true if the run must be reported as failed.
    pub fn is_failed(&self) -> bool {
        self.error.as_ref().is_some_and(WorkflowError::is_critical)
    }
}

//! Mock database clients for testing.
//!
//! `MockDatabaseClient` replays scripted schema and query outcomes and
//! records every statement it receives, so tests can assert both what ran
//! and how often the database was contacted.

use super::{DatabaseClient, QueryResult};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted database client.
///
/// Schema responses and query outcomes are consumed in order. When a script
/// runs dry the last configured default is used: the default schema for
/// `schema_info` and an empty result for `execute_query`.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: String,
    schema_script: Mutex<VecDeque<Result<String>>>,
    query_script: Mutex<VecDeque<Result<QueryResult>>>,
    executed: Mutex<Vec<String>>,
    schema_calls: AtomicUsize,
}

impl MockDatabaseClient {
    /// Creates a mock with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose schema text is `schema`.
    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Queues a schema fetch failure.
    pub fn fail_schema(self, message: impl Into<String>) -> Self {
        self.lock_schema_script()
            .push_back(Err(AppError::connection(message)));
        self
    }

    /// Queues a successful query result.
    pub fn push_result(self, result: QueryResult) -> Self {
        self.lock_query_script().push_back(Ok(result));
        self
    }

    /// Queues a query failure with the given driver message.
    pub fn push_error(self, message: impl Into<String>) -> Self {
        self.lock_query_script()
            .push_back(Err(AppError::query(message)));
        self
    }

    /// Returns every statement passed to `execute_query`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns how many times `execute_query` was called.
    pub fn execute_calls(&self) -> usize {
        self.executed().len()
    }

    /// Returns how many times `schema_info` was called.
    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    fn lock_schema_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.schema_script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_query_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<QueryResult>>> {
        self.query_script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn schema_info(&self) -> Result<String> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.lock_schema_script()
            .pop_front()
            .unwrap_or_else(|| Ok(self.schema.clone()))
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        self.lock_query_script()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::new()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every call fails, as if the server were down.
#[derive(Debug, Default)]
pub struct FailingDatabaseClient {
    schema_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

impl FailingDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn schema_info(&self) -> Result<String> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::connection(
            "Cannot connect to db:5432. Check that the server is running.",
        ))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::connection(
            "Cannot connect to db:5432. Check that the server is running.",
        ))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

//! Database capability.
//!
//! The workflow only needs two things from the database: a text description
//! of the schema and the ability to run a statement. Both are expressed by
//! the `DatabaseClient` trait so tests can swap in scripted clients.

mod mock;
mod postgres;
mod schema;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Creates the PostgreSQL client described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PostgresClient> {
    PostgresClient::connect(config).await
}

/// Trait defining the interface for database clients.
///
/// Implementations are shared across concurrent workflow runs and must be
/// thread-safe.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns the schema description handed to the model.
    ///
    /// An empty string means "no schema" and is not an error by itself.
    async fn schema_info(&self) -> Result<String>;

    /// Executes a SQL statement and returns its rows.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the underlying connections.
    async fn close(&self) -> Result<()>;
}

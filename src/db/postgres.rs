//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait using a shared sqlx connection pool.

use crate::config::DatabaseConfig;
use crate::db::{Column, ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Table, Value};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 1000;

/// Number of example rows included per table in the schema description.
const SAMPLE_ROWS: usize = 3;

/// Pool size shared by all concurrent workflow runs.
const MAX_CONNECTIONS: u32 = 5;

/// How long a run waits for a pooled connection before failing.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Connections older than this are recycled.
const MAX_LIFETIME_SECS: u64 = 3600;

/// PostgreSQL database client.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: PgPool,
    target: String,
}

impl PostgresClient {
    /// Creates a client for the configured database.
    ///
    /// The pool connects lazily: an unreachable server surfaces on the first
    /// schema fetch, where the workflow's backoff policy deals with it.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let conn_str = config.validated_url()?;

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
            .connect_lazy(&conn_str)
            .map_err(|e| AppError::config(format!("Invalid connection string: {e}")))?;

        debug!(target_db = %config.display_string(), "Created lazy connection pool");

        Ok(Self {
            pool,
            target: config.display_string(),
        })
    }

    /// Describes every base table in the `public` schema.
    ///
    /// Columns and primary keys come from two catalog queries; sample rows
    /// are fetched per table and are best effort.
    pub async fn introspect_schema(&self) -> Result<Schema> {
        let columns: Vec<(String, String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT c.table_name::text, c.column_name::text, c.data_type::text,
                   c.is_nullable::text, c.column_default::text
            FROM information_schema.columns c
            JOIN information_schema.tables t
              ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE c.table_schema = 'public' AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.map_connection_error(e))?;

        let primary_keys: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT tc.table_name::text, kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON kcu.constraint_name = tc.constraint_name
             AND kcu.table_schema = tc.table_schema
            WHERE tc.table_schema = 'public' AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY tc.table_name, kcu.ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::query(format!("Failed to read primary keys: {e}")))?;

        let mut tables: Vec<Table> = Vec::new();
        for (table_name, name, data_type, is_nullable, default) in columns {
            if tables.last().map(|t| t.name.as_str()) != Some(table_name.as_str()) {
                tables.push(Table::new(table_name));
            }
            if let Some(table) = tables.last_mut() {
                table.columns.push(Column {
                    name,
                    data_type,
                    is_nullable: is_nullable == "YES",
                    default,
                });
            }
        }

        for table in &mut tables {
            table.primary_key = primary_keys
                .iter()
                .filter(|(owner, _)| *owner == table.name)
                .map(|(_, column)| column.clone())
                .collect();
            table.sample_rows = self.fetch_sample_rows(&table.name).await;
        }

        Ok(Schema { tables })
    }

    /// Fetches a few example rows. Failures only cost the model some context.
    async fn fetch_sample_rows(&self, table_name: &str) -> Vec<Row> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {SAMPLE_ROWS}",
            quote_identifier(table_name)
        );
        match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows.iter().map(convert_row).collect(),
            Err(e) => {
                warn!(table = table_name, error = %e, "Could not fetch sample rows");
                Vec::new()
            }
        }
    }

    /// Maps sqlx connection errors to user-friendly messages.
    fn map_connection_error(&self, error: sqlx::Error) -> AppError {
        let error_str = error.to_string().to_lowercase();
        let target = &self.target;

        if error_str.contains("connection refused") || error_str.contains("could not connect") {
            AppError::connection(format!(
                "Cannot connect to {target}. Check that the server is running."
            ))
        } else if error_str.contains("password authentication failed")
            || error_str.contains("authentication failed")
        {
            AppError::connection(format!(
                "Authentication failed for {target}. Check your credentials."
            ))
        } else if matches!(error, sqlx::Error::PoolTimedOut) {
            AppError::connection(format!(
                "Timed out waiting for a connection to {target}. The pool may be exhausted."
            ))
        } else if error_str.contains("timed out") || error_str.contains("timeout") {
            AppError::connection(format!(
                "Connection to {target} timed out. The server may be overloaded or unreachable."
            ))
        } else {
            AppError::connection(error.to_string())
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn schema_info(&self) -> Result<String> {
        let schema = self.introspect_schema().await?;
        debug!(tables = schema.tables.len(), "Introspected schema");
        Ok(schema.format_for_llm())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        // One row past the cap is enough to detect truncation.
        let fetched = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql)
                .fetch(&self.pool)
                .take(MAX_ROWS + 1)
                .try_collect::<Vec<PgRow>>(),
        )
        .await;

        let pg_rows = match fetched {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(AppError::query(format_query_error(e))),
            Err(_) => {
                return Err(AppError::query(format!(
                    "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
                )))
            }
        };

        let columns = pg_rows.first().map(column_info).unwrap_or_default();
        let was_truncated = pg_rows.len() > MAX_ROWS;
        if was_truncated {
            warn!(kept = MAX_ROWS, "Truncating query result");
        }

        let rows: Vec<Row> = pg_rows.iter().take(MAX_ROWS).map(convert_row).collect();
        Ok(QueryResult {
            row_count: rows.len(),
            columns,
            rows,
            was_truncated,
            elapsed: start.elapsed(),
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|col| convert_value(row, col.ordinal(), col.type_info().name()))
        .collect()
}

/// Decodes column `index` as `T`; NULLs and undecodable cells become `Value::Null`.
fn decode<'r, T>(row: &'r PgRow, index: usize, wrap: impl FnOnce(T) -> Value) -> Value
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(Some(v)) => wrap(v),
        _ => Value::Null,
    }
}

fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => decode::<bool>(row, index, Value::Bool),
        "INT2" => decode::<i16>(row, index, |v| Value::Int(v.into())),
        "INT4" => decode::<i32>(row, index, |v| Value::Int(v.into())),
        "INT8" => decode::<i64>(row, index, Value::Int),
        "FLOAT4" => decode::<f32>(row, index, |v| Value::Float(v.into())),
        "FLOAT8" => decode::<f64>(row, index, Value::Float),
        "NUMERIC" => decode::<Decimal>(row, index, |v| Value::Numeric(v.to_string())),
        "DATE" => decode::<NaiveDate>(row, index, |v| Value::Text(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, index, |v| Value::Text(v.to_string())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index, |v| Value::Text(v.to_string())),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index, |v| Value::Text(v.to_rfc3339())),
        "UUID" => decode::<Uuid>(row, index, |v| Value::Text(v.to_string())),
        "JSON" | "JSONB" => decode::<JsonValue>(row, index, |v| Value::Text(v.to_string())),
        _ => match decode::<String>(row, index, Value::Text) {
            Value::Null => opaque_value(row, index, type_name),
            value => value,
        },
    }
}

/// Placeholder for a non-NULL cell whose type has no text decoding.
fn opaque_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => Value::Text(format!("<{}>", type_name.to_lowercase())),
        _ => Value::Null,
    }
}

/// Formats a query error with Postgres detail and hint when available.
///
/// The text is fed back to the model on retry, so the hint matters.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}

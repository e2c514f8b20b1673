//! PostgreSQL integration tests.
//!
//! Skipped unless DATABASE_URL points at a reachable server.

use std::sync::Arc;

use sqlpilot::config::DatabaseConfig;
use sqlpilot::db::{DatabaseClient, PostgresClient, Value};
use sqlpilot::error::WorkflowError;
use sqlpilot::query::SqlExecutor;

/// Helper to create a test client.
async fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig { url: Some(url) };
    let client = PostgresClient::connect(&config).await.ok()?;
    // The pool is lazy; make sure the server actually answers.
    client.execute_query("SELECT 1").await.ok()?;
    Some(client)
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 as num, 'hello' as greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][1], Value::Text("hello".to_string()));
    assert_eq!(result.to_result_text(), "[(1, 'hello')]");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_schema_info_describes_tables() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client
        .execute_query("CREATE TABLE IF NOT EXISTS sqlpilot_probe (id INTEGER PRIMARY KEY, label TEXT)")
        .await
        .unwrap();

    let schema = client.schema_info().await.unwrap();
    assert!(schema.contains("CREATE TABLE sqlpilot_probe"));
    assert!(schema.contains("label"));

    let introspected = client.introspect_schema().await.unwrap();
    let table = introspected
        .tables
        .iter()
        .find(|t| t.name == "sqlpilot_probe")
        .expect("probe table present");
    assert_eq!(table.primary_key, vec!["id".to_string()]);

    client
        .execute_query("DROP TABLE IF EXISTS sqlpilot_probe")
        .await
        .unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_column_reports_driver_message() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client
        .execute_query("SELECT no_such_column FROM pg_class")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no_such_column"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_executor_blocks_writes_before_the_server() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = SqlExecutor::new(Arc::new(client), ';');

    let err = executor
        .execute("DROP TABLE IF EXISTS employees")
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::UnsafeQuery);

    let rows = executor.execute("SELECT 2; SELECT 3").await.unwrap();
    assert_eq!(rows.rows, vec![vec![Value::Int(2)]]);
}

#[tokio::test]
async fn test_numeric_and_date_columns_keep_their_values() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client
        .execute_query(
            "CREATE TABLE IF NOT EXISTS sqlpilot_payroll \
             (name TEXT, salary NUMERIC(10,2), hire_date DATE, performance_score INT)",
        )
        .await
        .unwrap();
    client.execute_query("DELETE FROM sqlpilot_payroll").await.unwrap();
    client
        .execute_query(
            "INSERT INTO sqlpilot_payroll VALUES \
             ('Alice', 1234.50, '2020-01-02', 9), ('Bob', 99.00, '2021-06-30', 7)",
        )
        .await
        .unwrap();

    let result = client
        .execute_query(
            "SELECT name, salary, hire_date, AVG(performance_score) OVER () AS avg_score \
             FROM sqlpilot_payroll ORDER BY name",
        )
        .await
        .unwrap();
    assert_eq!(result.rows[0][1], Value::Numeric("1234.50".to_string()));
    assert_eq!(result.rows[0][2], Value::Text("2020-01-02".to_string()));
    assert!(matches!(&result.rows[0][3], Value::Numeric(avg) if avg.starts_with('8')));
    assert!(!result.to_result_text().contains("None"));

    let schema = client.schema_info().await.unwrap();
    assert!(schema.contains("1234.50"));
    assert!(schema.contains("2020-01-02"));

    client
        .execute_query("DROP TABLE IF EXISTS sqlpilot_payroll")
        .await
        .unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_large_result_is_capped() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT g FROM generate_series(1, 5000) AS g")
        .await
        .unwrap();
    assert_eq!(result.row_count, 1000);
    assert!(result.was_truncated);

    let small = client
        .execute_query("SELECT g FROM generate_series(1, 1000) AS g")
        .await
        .unwrap();
    assert_eq!(small.row_count, 1000);
    assert!(!small.was_truncated);

    client.close().await.unwrap();
}

//! End-to-end workflow scenarios against scripted capabilities.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use pretty_assertions::assert_eq;
use sqlpilot::config::WorkflowConfig;
use sqlpilot::db::{ColumnInfo, FailingDatabaseClient, MockDatabaseClient, QueryResult, Value};
use sqlpilot::error::WorkflowError;
use sqlpilot::llm::MockLlmClient;
use sqlpilot::workflow::{
    BackoffPolicy, NoopObserver, RunStatus, Stage, StageUpdate, WorkflowController,
    SKIP_SENTINEL, UNREACHABLE_MESSAGE,
};

const SCHEMA: &str = "CREATE TABLE employees (\n  name TEXT,\n  location TEXT,\n  manager_name TEXT\n);";

fn workflow_config(max_retries: u32) -> WorkflowConfig {
    WorkflowConfig {
        max_retries,
        retry_delay_secs: 0,
        ..WorkflowConfig::default()
    }
}

fn controller(
    db: Arc<dyn sqlpilot::db::DatabaseClient>,
    llm: Arc<dyn sqlpilot::llm::LlmClient>,
    max_retries: u32,
) -> WorkflowController {
    WorkflowController::new(db, llm, &workflow_config(max_retries))
        .with_schema_backoff(BackoffPolicy::immediate(3))
        .with_observer(Arc::new(NoopObserver))
}

fn names(rows: &[&str]) -> QueryResult {
    QueryResult::with_data(
        vec![ColumnInfo::new("name", "text")],
        rows.iter().map(|n| vec![Value::from(*n)]).collect(),
    )
}

#[tokio::test]
async fn test_scenario_success() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA).push_result(names(&["Alice", "Bob"])));
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("```sql\nSELECT name FROM employees WHERE location = 'Remote';\n```")
            .push_response("Alice and Bob work remotely."),
    );

    let outcome = controller(db.clone(), llm.clone(), 3)
        .run_to_completion("Who works remotely?".into(), vec![])
        .await;

    assert_eq!(outcome.status(), RunStatus::Completed);
    assert_eq!(outcome.result, "Alice and Bob work remotely.");
    assert_eq!(outcome.retry_count, 0);
    assert_eq!(
        db.executed(),
        vec!["SELECT name FROM employees WHERE location = 'Remote'".to_string()]
    );

    let summary = &llm.calls()[1];
    assert_eq!(summary.len(), 1, "summary prompt has no system block");
    assert!(summary[0].content.contains("User Query: \"Who works remotely?\""));
}

#[tokio::test]
async fn test_scenario_one_retry() {
    let db = Arc::new(
        MockDatabaseClient::with_schema(SCHEMA)
            .push_error("column \"is_remote\" does not exist")
            .push_result(names(&["Carol"])),
    );
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("SELECT name FROM employees WHERE is_remote")
            .push_response("SELECT name FROM employees WHERE location = 'Remote'")
            .push_response("Carol works remotely."),
    );

    let updates: Vec<StageUpdate> = controller(db.clone(), llm.clone(), 3)
        .run("Who works remotely?".into(), vec![])
        .collect()
        .await;

    let stages: Vec<Stage> = updates.iter().map(|u| u.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::FetchingSchema,
            Stage::Generating,
            Stage::Executing,
            Stage::Generating,
            Stage::Executing,
            Stage::Summarizing,
        ]
    );
    assert_eq!(updates[2].delta.retry_count, Some(1));
    assert_eq!(
        updates[5].delta.sql_query.as_deref(),
        Some("SELECT name FROM employees WHERE location = 'Remote'")
    );
    assert_eq!(updates[5].delta.result.as_deref(), Some("Carol works remotely."));
    assert!(llm.calls()[1][1]
        .content
        .contains("[PREVIOUS ERROR] Database returned: column \"is_remote\" does not exist"));
}

#[tokio::test]
async fn test_scenario_database_unreachable() {
    let db = Arc::new(FailingDatabaseClient::new());
    let llm = Arc::new(MockLlmClient::new());

    let outcome = controller(db.clone(), llm.clone(), 3)
        .run_to_completion("Who works remotely?".into(), vec![])
        .await;

    assert_eq!(outcome.status(), RunStatus::Failed);
    assert_eq!(outcome.result, UNREACHABLE_MESSAGE);
    assert_eq!(outcome.sql_query, SKIP_SENTINEL);
    assert_eq!(outcome.error, Some(WorkflowError::CriticalConnection));
    assert_eq!(db.schema_calls(), 3);
    assert_eq!(db.execute_calls(), 0);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_failures_terminate_within_budget() {
    for max_retries in 0..=4 {
        let mut db = MockDatabaseClient::with_schema(SCHEMA);
        for _ in 0..10 {
            db = db.push_error("syntax error at or near \"FORM\"");
        }
        let db = Arc::new(db);
        let llm = Arc::new(MockLlmClient::new().with_response("question", "SELECT name FORM employees"));

        let outcome = controller(db.clone(), llm, max_retries)
            .run_to_completion("Who?".into(), vec![])
            .await;

        // A zero budget still runs the first attempt once.
        let attempts = max_retries.max(1);
        assert_eq!(
            db.execute_calls() as u32,
            attempts,
            "max_retries={max_retries} executed {} times",
            db.execute_calls()
        );
        assert_eq!(outcome.retry_count, attempts, "max_retries={max_retries}");
        assert_eq!(outcome.status(), RunStatus::Completed);
    }
}

#[tokio::test]
async fn test_only_first_statement_runs() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA).push_result(names(&["x"])));
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("SELECT 1; DROP TABLE employees;")
            .push_response("One."),
    );

    controller(db.clone(), llm, 3)
        .run_to_completion("Anything".into(), vec![])
        .await;

    assert_eq!(db.executed(), vec!["SELECT 1".to_string()]);
}

#[tokio::test]
async fn test_unsafe_sql_is_retried_then_abandoned() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA));
    let llm = Arc::new(MockLlmClient::new().with_response("question", "DROP TABLE employees"));

    let outcome = controller(db.clone(), llm.clone(), 2)
        .run_to_completion("Delete everything".into(), vec![])
        .await;

    assert_eq!(outcome.error, Some(WorkflowError::UnsafeQuery));
    assert_eq!(outcome.retry_count, 2);
    assert_eq!(db.execute_calls(), 0);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_history_window_limits_context() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA).push_result(names(&["x"])));
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("SELECT name FROM employees")
            .push_response("x."),
    );
    let history: Vec<String> = (1..=6).map(|i| format!("turn {i}")).collect();

    controller(db, llm.clone(), 3)
        .run_to_completion("And their managers?".into(), history)
        .await;

    let prompt = &llm.calls()[0][1].content;
    assert!(prompt.contains("turn 3\nturn 4\nturn 5\nturn 6"));
    assert!(!prompt.contains("turn 2"));
}

#[tokio::test]
async fn test_observer_sees_every_stage() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA).push_result(names(&["x"])));
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("SELECT name FROM employees")
            .push_response("x."),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    WorkflowController::new(db, llm, &workflow_config(3))
        .with_observer(Arc::new(move |stage: Stage| sink.lock().unwrap().push(stage)))
        .run_to_completion("Who?".into(), vec![])
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Stage::FetchingSchema,
            Stage::Generating,
            Stage::Executing,
            Stage::Summarizing
        ]
    );
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA));
    let llm = Arc::new(MockLlmClient::new().with_response("question", "SELECT name FROM employees"));
    let controller = Arc::new(controller(db.clone(), llm, 3));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .run_to_completion(format!("Question {i}"), vec![])
                    .await
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.retry_count, 0);
        assert_eq!(outcome.error, None);
    }
    assert_eq!(db.execute_calls(), 4);
}

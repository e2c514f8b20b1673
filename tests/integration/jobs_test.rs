//! Job layer tests: submission, polling and the accumulation contract.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sqlpilot::config::WorkflowConfig;
use sqlpilot::db::{ColumnInfo, FailingDatabaseClient, MockDatabaseClient, QueryResult, Value};
use sqlpilot::jobs::{JobData, JobRecord, JobRegistry, JobStatus};
use sqlpilot::llm::MockLlmClient;
use sqlpilot::workflow::{BackoffPolicy, NoopObserver, WorkflowController, NO_DATA_MESSAGE};
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE employees (name TEXT, performance_score INT)";

fn registry(
    db: Arc<dyn sqlpilot::db::DatabaseClient>,
    llm: Arc<dyn sqlpilot::llm::LlmClient>,
) -> JobRegistry {
    let config = WorkflowConfig {
        retry_delay_secs: 0,
        ..WorkflowConfig::default()
    };
    let controller = WorkflowController::new(db, llm, &config)
        .with_schema_backoff(BackoffPolicy::immediate(3))
        .with_observer(Arc::new(NoopObserver));
    JobRegistry::new(Arc::new(controller))
}

async fn wait_for(jobs: &JobRegistry, id: Uuid) -> JobRecord {
    for _ in 0..200 {
        let job = jobs.get(&id).await.expect("job exists");
        if job.is_finished() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[tokio::test]
async fn test_submitted_job_completes_with_answer() {
    let db = Arc::new(MockDatabaseClient::with_schema(SCHEMA).push_result(QueryResult::with_data(
        vec![ColumnInfo::new("name", "text")],
        vec![vec![Value::from("Grace")]],
    )));
    let llm = Arc::new(
        MockLlmClient::new()
            .push_response("SELECT name FROM employees ORDER BY performance_score DESC LIMIT 1")
            .push_response("Grace is the top performer."),
    );
    let jobs = registry(db, llm);

    let id = jobs.submit("Who performs best?".into(), vec![]).await;
    let job = wait_for(&jobs, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.step, "summarize");
    assert_eq!(
        job.data,
        Some(JobData {
            response: Some("Grace is the top performer.".into()),
            sql_used: Some(
                "SELECT name FROM employees ORDER BY performance_score DESC LIMIT 1".into()
            ),
        })
    );
    assert_eq!(job.error, None);
}

#[tokio::test]
async fn test_retryable_error_does_not_fail_job() {
    let db = Arc::new(
        MockDatabaseClient::with_schema(SCHEMA)
            .push_error("syntax error")
            .push_error("syntax error")
            .push_error("syntax error"),
    );
    let llm = Arc::new(MockLlmClient::new().with_response("question", "SELEC name FROM employees"));
    let jobs = registry(db, llm);

    let id = jobs.create().await;
    jobs.run(id, "Who?".into(), vec![]).await;
    let job = jobs.get(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error, None);
    assert_eq!(
        job.data.and_then(|d| d.response).as_deref(),
        Some(NO_DATA_MESSAGE)
    );
}

#[tokio::test]
async fn test_unreachable_database_fails_job() {
    let jobs = registry(Arc::new(FailingDatabaseClient::new()), Arc::new(MockLlmClient::new()));

    let id = jobs.submit("Who?".into(), vec!["Hi".into()]).await;
    let job = wait_for(&jobs, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("CRITICAL_DB_CONNECTION_ERROR"));
    assert_eq!(
        job.data.and_then(|d| d.sql_used).as_deref(),
        Some("SKIP")
    );
}

#[tokio::test]
async fn test_jobs_are_tracked_separately() {
    let jobs = registry(
        Arc::new(MockDatabaseClient::with_schema(SCHEMA)),
        Arc::new(MockLlmClient::new().with_response("question", "SELECT name FROM employees")),
    );

    let first = jobs.submit("One?".into(), vec![]).await;
    let second = jobs.submit("Two?".into(), vec![]).await;

    assert_ne!(first, second);
    assert_eq!(jobs.len().await, 2);
    wait_for(&jobs, first).await;
    wait_for(&jobs, second).await;
}

#[tokio::test]
async fn test_finished_job_serializes_like_the_api() {
    let jobs = registry(Arc::new(FailingDatabaseClient::new()), Arc::new(MockLlmClient::new()));
    let id = jobs.create().await;
    jobs.run(id, "Who?".into(), vec![]).await;

    let json = serde_json::to_value(jobs.get(&id).await.unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "status": "failed",
            "step": "summarize",
            "data": {
                "response": "System Error: Database unreachable.",
                "sql_used": "SKIP"
            },
            "error": "CRITICAL_DB_CONNECTION_ERROR"
        })
    );
}

//! HTTP surface for the job layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{AppError, Result};
use crate::jobs::{JobRecord, JobRegistry};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobRegistry,
}

/// Body of `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub session_id: String,
    #[serde(default)]
    pub history: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryAccepted {
    pub job_id: Uuid,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/query", post(submit_query))
        .route("/job/{job_id}", get(get_job))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `config.host:config.port` and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::config(format!("Cannot bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryAccepted> {
    info!(session_id = %req.session_id, "Query received");
    let job_id = state
        .jobs
        .submit(req.query, req.history.unwrap_or_default())
        .await;
    Json(QueryAccepted { job_id })
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> std::result::Result<Json<JobRecord>, (StatusCode, Json<Value>)> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Job not found" })),
        )
    };

    let id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    state.jobs.get(&id).await.map(Json).ok_or_else(not_found)
}

//! Background jobs.
//!
//! Each submitted question becomes a job that runs the workflow on its own
//! tokio task. The registry keeps every job's status in memory so clients
//! can poll for progress and the final answer.

mod accumulator;

pub use accumulator::RunAccumulator;

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::workflow::WorkflowController;

/// Step reported before the task starts.
pub const STEP_QUEUED: &str = "queued";

/// Step reported once the task has picked the job up.
pub const STEP_INITIALIZING: &str = "initializing";

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// Final payload of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
    pub response: Option<String>,
    pub sql_used: Option<String>,
}

/// Everything a client can see about a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub step: String,
    pub data: Option<JobData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    fn queued() -> Self {
        Self {
            status: JobStatus::Processing,
            step: STEP_QUEUED.to_string(),
            data: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != JobStatus::Processing
    }
}

/// In-memory job store plus the controller that runs the jobs.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    controller: Arc<WorkflowController>,
}

impl JobRegistry {
    pub fn new(controller: Arc<WorkflowController>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            controller,
        }
    }

    /// Registers a job and starts it in the background.
    pub async fn submit(&self, question: String, chat_history: Vec<String>) -> Uuid {
        let id = self.create().await;
        let registry = self.clone();

        tokio::spawn(async move {
            let worker = registry.clone();
            let task = tokio::spawn(async move { worker.run(id, question, chat_history).await });

            if let Err(e) = task.await {
                error!(job_id = %id, error = %e, "Job crashed");
                registry
                    .update(id, |job| {
                        job.status = JobStatus::Failed;
                        job.error = Some(e.to_string());
                    })
                    .await;
            }
        });

        id
    }

    /// Registers a new job in the `queued` step without starting it.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, JobRecord::queued());
        id
    }

    /// Runs the workflow for job `id` and records its progress.
    pub async fn run(&self, id: Uuid, question: String, chat_history: Vec<String>) {
        info!(job_id = %id, "Starting job");
        self.set_step(id, STEP_INITIALIZING).await;

        let mut acc = RunAccumulator::new();
        let mut updates = Box::pin(self.controller.run(question, chat_history));
        while let Some(update) = updates.next().await {
            info!(job_id = %id, step = update.stage.as_str(), "Job reached step");
            self.set_step(id, update.stage.as_str()).await;
            acc.record(&update);
        }

        let failed = acc.is_failed();
        let error = acc.error.as_ref().map(ToString::to_string);
        let data = JobData {
            response: acc.result,
            sql_used: acc.sql_query,
        };

        self.update(id, |job| {
            job.data = Some(data);
            if failed {
                job.status = JobStatus::Failed;
                job.error = error;
            } else {
                job.status = JobStatus::Completed;
            }
        })
        .await;

        info!(job_id = %id, failed, "Job finished");
    }

    /// Returns a snapshot of job `id`.
    pub async fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn set_step(&self, id: Uuid, step: &str) {
        self.update(id, |job| job.step = step.to_string()).await;
    }

    async fn update(&self, id: Uuid, f: impl FnOnce(&mut JobRecord)) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            f(job);
        }
    }
}

//! The question-answering workflow.
//!
//! A run moves through four stages: fetch the schema, generate SQL, execute
//! it behind the safety gate, and summarize the rows. Execution and
//! generation failures loop back to generation until the retry budget is
//! spent; an unreachable database short-circuits straight to the summary.

pub mod backoff;
pub mod controller;
pub mod observer;
pub mod stage;
pub mod state;

pub use backoff::BackoffPolicy;
pub use controller::{
    RunStatus, WorkflowController, WorkflowOutcome, NO_DATA_MESSAGE, UNREACHABLE_MESSAGE,
};
pub use observer::{NoopObserver, StageObserver, TracingObserver};
pub use stage::{RetryDecision, Stage, StageUpdate};
pub use state::{ErrorUpdate, StateDelta, WorkflowState, SKIP_SENTINEL};

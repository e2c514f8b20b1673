//! Stage progress callbacks.

use tracing::info;

use super::stage::Stage;

/// Receives a notification as each stage starts.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, stage: Stage);
}

impl<F> StageObserver for F
where
    F: Fn(Stage) + Send + Sync,
{
    fn on_stage(&self, stage: Stage) {
        self(stage)
    }
}

/// Narrates stage transitions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage(&self, stage: Stage) {
        info!(stage = stage.as_str(), "--- {} ---", stage.label());
    }
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _stage: Stage) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = move |stage: Stage| sink.lock().unwrap().push(stage);

        observer.on_stage(Stage::FetchingSchema);
        observer.on_stage(Stage::Generating);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Stage::FetchingSchema, Stage::Generating]
        );
    }

    #[test]
    fn test_builtin_observers_accept_all_stages() {
        for stage in [
            Stage::FetchingSchema,
            Stage::Generating,
            Stage::Executing,
            Stage::Summarizing,
            Stage::Done,
        ] {
            TracingObserver.on_stage(stage);
            NoopObserver.on_stage(stage);
        }
    }
}

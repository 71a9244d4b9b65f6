//! Persistence collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a persistence collaborator. Both variants are retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistError {
    /// The destination refused the data (maps to a network fault).
    #[error("save rejected: {0}")]
    Rejected(String),
    /// Anything else (maps to a system fault).
    #[error("unexpected persistence failure: {0}")]
    Unexpected(String),
}

/// Receives cleaned wizard data.
#[async_trait]
pub trait StepPersistence: Send + Sync {
    /// Persists the data after the step `step_id` was accepted.
    async fn save_step(&self, step_id: &str, data: &Value) -> Result<(), PersistError>;

    /// Called once after the final step was saved.
    async fn finish(&self, data: &Value) -> Result<(), PersistError>;
}

/// One call received by [`MemoryPersistence`].
#[derive(Debug, Clone, PartialEq)]
pub enum PersistCall {
    SaveStep { step_id: String, data: Value },
    Finish { data: Value },
}

/// In-memory persistence that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    calls: Mutex<Vec<PersistCall>>,
    failures: Mutex<VecDeque<PersistError>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error returned by the next call (save or finish).
    pub fn fail_next(&self, error: PersistError) {
        self.failures.lock().expect("persistence lock poisoned").push_back(error);
    }

    pub fn calls(&self) -> Vec<PersistCall> {
        self.calls.lock().expect("persistence lock poisoned").clone()
    }

    /// Data passed to the most recent successful call.
    pub fn last_saved(&self) -> Option<Value> {
        self.calls.lock().expect("persistence lock poisoned").last().map(|call| match call {
            PersistCall::SaveStep { data, .. } | PersistCall::Finish { data } => data.clone(),
        })
    }

    pub fn finished(&self) -> bool {
        self.calls
            .lock()
            .expect("persistence lock poisoned")
            .iter()
            .any(|call| matches!(call, PersistCall::Finish { .. }))
    }

    fn record(&self, call: PersistCall) -> Result<(), PersistError> {
        if let Some(error) = self.failures.lock().expect("persistence lock poisoned").pop_front() {
            return Err(error);
        }
        self.calls.lock().expect("persistence lock poisoned").push(call);
        Ok(())
    }
}

#[async_trait]
impl StepPersistence for MemoryPersistence {
    async fn save_step(&self, step_id: &str, data: &Value) -> Result<(), PersistError> {
        self.record(PersistCall::SaveStep {
            step_id: step_id.to_string(),
            data: data.clone(),
        })
    }

    async fn finish(&self, data: &Value) -> Result<(), PersistError> {
        self.record(PersistCall::Finish { data: data.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_calls_and_replays_queued_failures() {
        let persistence = MemoryPersistence::new();
        persistence.fail_next(PersistError::Rejected("offline".into()));

        let failed = persistence.save_step("module", &json!({"name": "a"})).await;
        assert_eq!(failed, Err(PersistError::Rejected("offline".into())));
        assert!(persistence.calls().is_empty());

        persistence.save_step("module", &json!({"name": "b"})).await.expect("save");
        persistence.finish(&json!({"name": "b"})).await.expect("finish");
        assert_eq!(persistence.calls().len(), 2);
        assert_eq!(persistence.last_saved(), Some(json!({"name": "b"})));
        assert!(persistence.finished());
    }
}

//! Two-phase execution recording.

use crate::error::StoreError;
use crate::execution::Execution;
use crate::http::Outcome;
use crate::store::TaskStore;
use crate::task::Task;
use std::sync::Arc;
use taskhook_core::{ExecutionId, Result};

/// Writes the `started` row before a webhook call and finalizes it after.
#[derive(Clone)]
pub struct ExecutionRecorder {
    store: Arc<dyn TaskStore>,
}

impl ExecutionRecorder {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Write 1: inserts a `started` execution for `task`.
    ///
    /// # Errors
    ///
    /// Returns the store error; the caller must not dispatch the task.
    pub async fn start(&self, task: &Task) -> Result<ExecutionId, StoreError> {
        let execution = Execution::started(task.id);
        self.store.create_execution(&execution).await
    }

    /// Write 2: moves the execution to its terminal state.
    ///
    /// # Errors
    ///
    /// Returns the store error. The outcome is lost but the task may still
    /// be rescheduled.
    pub async fn finish(&self, id: ExecutionId, outcome: &Outcome) -> Result<(), StoreError> {
        self.store
            .update_execution(id, outcome.status, outcome.status_code, &outcome.body)
            .await
    }
}

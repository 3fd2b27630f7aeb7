//! Advancing tasks to their next due time.

use crate::error::RescheduleError;
use crate::store::TaskStore;
use crate::task::Task;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskhook_core::Result;

/// Computes the due time that follows `task.scheduled_at`.
///
/// # Errors
///
/// Returns `RescheduleError::OutOfRange` if the result is not representable.
pub fn next_run(task: &Task) -> std::result::Result<DateTime<Utc>, RescheduleError> {
    task.cadence
        .next_after(task.scheduled_at)
        .map_err(|_| RescheduleError::OutOfRange {
            scheduled_at: task.scheduled_at,
        })
}

/// Persists each task's next due time.
#[derive(Clone)]
pub struct Rescheduler {
    store: Arc<dyn TaskStore>,
}

impl Rescheduler {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Advances `task` by one cadence step and stores the new due time.
    ///
    /// # Errors
    ///
    /// Returns an error if the next time is out of range (nothing is written)
    /// or the store rejects the update.
    pub async fn reschedule(&self, task: &Task) -> Result<DateTime<Utc>, RescheduleError> {
        let next = next_run(task)?;
        self.store
            .update_task_scheduled_at(task.id, next)
            .await
            .map_err(|e| RescheduleError::PersistFailed {
                reason: e.to_string(),
            })?;
        Ok(next)
    }
}

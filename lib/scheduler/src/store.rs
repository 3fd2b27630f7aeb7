//! The task store port.
//!
//! The scheduler never owns durable state. It reads due tasks and writes
//! execution rows and new due times through this trait, so the Postgres
//! store and the in-memory store are interchangeable.

use crate::error::StoreError;
use crate::execution::{Execution, ExecutionStatus};
use crate::task::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskhook_core::{ExecutionId, Result, TaskId};

/// Storage for tasks and their executions, as seen by the scheduler.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns every active task with `scheduled_at <= now`.
    ///
    /// No ordering is guaranteed. Calling this twice with the same `now`
    /// and no writes in between returns the same set.
    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StoreError>;

    /// Inserts a `started` execution row.
    async fn create_execution(&self, execution: &Execution) -> Result<ExecutionId, StoreError>;

    /// Finalizes an execution row with its outcome.
    async fn update_execution(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        status_code: u16,
        response: &str,
    ) -> Result<(), StoreError>;

    /// Sets a task's next due time.
    async fn update_task_scheduled_at(
        &self,
        id: TaskId,
        next: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

//! PostgreSQL implementation of the scheduler's task store.

use super::{ExecutionRepository, TaskRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taskhook_core::{ExecutionId, Result, TaskId};
use taskhook_scheduler::{Execution, ExecutionStatus, StoreError, Task, TaskStore};

/// `TaskStore` backed by the `tasks` and `executions` tables.
#[derive(Clone)]
pub struct PgTaskStore {
    tasks: TaskRepository,
    executions: ExecutionRepository,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            executions: ExecutionRepository::new(pool),
        }
    }
}

fn read_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::Decode(e) => StoreError::Corrupt {
            reason: e.to_string(),
        },
        other => StoreError::QueryFailed {
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.list_due(now).await.map_err(read_error)?)
    }

    async fn create_execution(&self, execution: &Execution) -> Result<ExecutionId, StoreError> {
        self.executions
            .create(execution)
            .await
            .map_err(|e| StoreError::InsertFailed {
                reason: e.to_string(),
            })?;
        Ok(execution.id)
    }

    async fn update_execution(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        status_code: u16,
        response: &str,
    ) -> Result<(), StoreError> {
        let updated = self
            .executions
            .finish(id, status, status_code, response)
            .await
            .map_err(|e| StoreError::UpdateFailed {
                reason: e.to_string(),
            })?;
        if updated == 0 {
            return Err(StoreError::UpdateFailed {
                reason: format!("execution {id} is missing or already finalized"),
            }
            .into());
        }
        Ok(())
    }

    async fn update_task_scheduled_at(
        &self,
        id: TaskId,
        next: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated = self
            .tasks
            .update_scheduled_at(id, next)
            .await
            .map_err(|e| StoreError::UpdateFailed {
                reason: e.to_string(),
            })?;
        if updated == 0 {
            return Err(StoreError::UpdateFailed {
                reason: format!("task {id} not found"),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_reported_as_corrupt_rows() {
        let err = read_error(crate::db::decode_error("invalid task id 'x'".to_string()));
        assert!(matches!(err, StoreError::Corrupt { .. }));

        let err = read_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::QueryFailed { .. }));
    }
}

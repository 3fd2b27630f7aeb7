//! In-memory task store.
//!
//! Backs tests and local runs without Postgres. Individual operations can be
//! told to fail so error paths of the scheduler can be exercised.

use crate::error::StoreError;
use crate::execution::{Execution, ExecutionStatus};
use crate::store::TaskStore;
use crate::task::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use taskhook_core::{ExecutionId, Result, TaskId};

/// Store operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindDueTasks,
    CreateExecution,
    UpdateExecution,
    UpdateTaskScheduledAt,
}

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, Task>,
    executions: Vec<Execution>,
    failing: Vec<StoreOp>,
    writes: usize,
    selections: usize,
}

/// A `TaskStore` kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<State>,
}

impl InMemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a task.
    pub fn insert_task(&self, task: Task) {
        self.state().tasks.insert(task.id, task);
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.state().tasks.get(&id).cloned()
    }

    /// All execution rows in insertion order.
    #[must_use]
    pub fn executions(&self) -> Vec<Execution> {
        self.state().executions.clone()
    }

    #[must_use]
    pub fn executions_for(&self, task_id: TaskId) -> Vec<Execution> {
        self.state()
            .executions
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Number of successful writes of any kind.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Number of `find_due_tasks` calls, failed ones included.
    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.state().selections
    }

    /// Makes every subsequent call of `op` fail until cleared.
    pub fn fail_on(&self, op: StoreOp) {
        let mut state = self.state();
        if !state.failing.contains(&op) {
            state.failing.push(op);
        }
    }

    /// Clears all forced failures.
    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    fn check(state: &State, op: StoreOp) -> std::result::Result<(), StoreError> {
        if !state.failing.contains(&op) {
            return Ok(());
        }
        let reason = format!("{op:?} forced to fail");
        Err(match op {
            StoreOp::FindDueTasks => StoreError::QueryFailed { reason },
            StoreOp::CreateExecution => StoreError::InsertFailed { reason },
            StoreOp::UpdateExecution | StoreOp::UpdateTaskScheduledAt => {
                StoreError::UpdateFailed { reason }
            }
        })
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let mut state = self.state();
        state.selections += 1;
        Self::check(&state, StoreOp::FindDueTasks)?;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect())
    }

    async fn create_execution(&self, execution: &Execution) -> Result<ExecutionId, StoreError> {
        let mut state = self.state();
        Self::check(&state, StoreOp::CreateExecution)?;
        if state.executions.iter().any(|e| e.id == execution.id) {
            return Err(StoreError::InsertFailed {
                reason: format!("duplicate execution {}", execution.id),
            }
            .into());
        }
        state.executions.push(execution.clone());
        state.writes += 1;
        Ok(execution.id)
    }

    async fn update_execution(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        status_code: u16,
        response: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, StoreOp::UpdateExecution)?;
        let execution = state
            .executions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::UpdateFailed {
                reason: format!("execution {id} not found"),
            })?;
        if execution.status.is_terminal() {
            return Err(StoreError::UpdateFailed {
                reason: format!("execution {id} is already {}", execution.status),
            }
            .into());
        }
        execution.status = status;
        execution.status_code = status_code;
        execution.response = response.to_string();
        state.writes += 1;
        Ok(())
    }

    async fn update_task_scheduled_at(
        &self,
        id: TaskId,
        next: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, StoreOp::UpdateTaskScheduledAt)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::UpdateFailed {
                reason: format!("task {id} not found"),
            })?;
        task.scheduled_at = next;
        state.writes += 1;
        Ok(())
    }
}

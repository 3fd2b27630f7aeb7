//! The per-task pipeline.
//!
//! Each due task goes through four strictly ordered steps:
//!
//! 1. record the `started` execution
//! 2. call the webhook
//! 3. finalize the execution
//! 4. advance `scheduled_at` by one cadence step
//!
//! Failing step 1 skips the rest, so the task stays due. Failures in steps
//! 2 to 4 never stop the following steps.

use crate::error::DispatchError;
use crate::http::{HttpExecutor, Outcome};
use crate::recorder::ExecutionRecorder;
use crate::reschedule::Rescheduler;
use crate::store::TaskStore;
use crate::task::Task;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskhook_core::{ExecutionId, TaskId};
use tracing::{error, info, instrument, warn};

/// What happened to one task during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub task_id: TaskId,
    /// Absent when the started row could not be written.
    pub execution_id: Option<ExecutionId>,
    /// Absent when the task was skipped before the webhook call.
    pub outcome: Option<Outcome>,
    /// The stored next due time, if rescheduling succeeded.
    pub next_run: Option<DateTime<Utc>>,
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            execution_id: None,
            outcome: None,
            next_run: None,
            errors: Vec::new(),
        }
    }

    /// Whether the task was dispatched at all.
    #[must_use]
    pub fn dispatched(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Runs the record, execute, record, reschedule pipeline for one task.
#[derive(Clone)]
pub struct TaskDispatcher {
    recorder: ExecutionRecorder,
    executor: HttpExecutor,
    rescheduler: Rescheduler,
}

impl TaskDispatcher {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, executor: HttpExecutor) -> Self {
        Self {
            recorder: ExecutionRecorder::new(store.clone()),
            executor,
            rescheduler: Rescheduler::new(store),
        }
    }

    /// Dispatches `task` once. Never fails: every problem is logged and
    /// listed in the report.
    #[instrument(skip(self, task), fields(task_id = %task.id, url = %task.url))]
    pub async fn dispatch(&self, task: Task) -> DispatchReport {
        let mut report = DispatchReport::new(task.id);

        let execution_id = match self.recorder.start(&task).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to record execution start, skipping task");
                report.errors.push(DispatchError::RecordStart { task_id: task.id });
                return report;
            }
        };
        report.execution_id = Some(execution_id);

        let outcome = self.executor.execute(&task).await;

        if let Err(e) = self.recorder.finish(execution_id, &outcome).await {
            error!(%execution_id, error = %e, "failed to finalize execution");
            report.errors.push(DispatchError::RecordFinish {
                task_id: task.id,
                execution_id,
            });
        }

        match self.rescheduler.reschedule(&task).await {
            Ok(next) => {
                info!(
                    %execution_id,
                    status = %outcome.status,
                    status_code = outcome.status_code,
                    next_run = %next,
                    "task dispatched"
                );
                report.next_run = Some(next);
            }
            Err(e) => {
                warn!(%execution_id, error = %e, "failed to reschedule task");
                report.errors.push(DispatchError::Reschedule { task_id: task.id });
            }
        }

        report.outcome = Some(outcome);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::CadenceUnit;
    use crate::error::TransportError;
    use crate::execution::{ExecutionStatus, NO_RESPONSE};
    use crate::memory::{InMemoryTaskStore, StoreOp};
    use crate::testing::{Reply, ScriptedTransport, task_due};
    use chrono::{Duration, TimeZone};

    fn dispatcher(store: Arc<InMemoryTaskStore>, transport: ScriptedTransport) -> TaskDispatcher {
        TaskDispatcher::new(
            store,
            HttpExecutor::new(Arc::new(transport), std::time::Duration::from_secs(30)),
        )
    }

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn successful_dispatch_records_and_reschedules() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = task_due("http://hook.test/a", 1, CadenceUnit::Hour, nine_am());
        store.insert_task(task.clone());

        let report = dispatcher(store.clone(), ScriptedTransport::answering(200, "ok"))
            .dispatch(task.clone())
            .await;

        assert!(report.errors.is_empty());
        assert_eq!(report.next_run, Some(nine_am() + Duration::hours(1)));
        let rows = store.executions_for(task.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(Some(rows[0].id), report.execution_id);
        assert_eq!(rows[0].status, ExecutionStatus::Completed);
        assert_eq!(rows[0].response, "ok");
    }

    #[tokio::test]
    async fn transport_failure_is_recorded_and_still_rescheduled() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = task_due("http://hook.test/down", 1, CadenceUnit::Hour, nine_am());
        store.insert_task(task.clone());
        let transport = ScriptedTransport::answering(200, "ok").with_reply(
            "http://hook.test/down",
            Reply::Fail(TransportError::ConnectionFailed {
                reason: "connection refused".to_string(),
            }),
        );

        let report = dispatcher(store.clone(), transport).dispatch(task.clone()).await;

        assert!(report.errors.is_empty());
        let rows = store.executions_for(task.id);
        assert_eq!(rows[0].status, ExecutionStatus::Failed);
        assert_eq!(rows[0].status_code, NO_RESPONSE);
        assert!(rows[0].response.contains("connection refused"));
        assert_eq!(
            store.task(task.id).unwrap().scheduled_at,
            nine_am() + Duration::hours(1)
        );
    }

    #[tokio::test]
    async fn start_failure_skips_call_and_reschedule() {
        let store = Arc::new(InMemoryTaskStore::new());
        store.fail_on(StoreOp::CreateExecution);
        let task = task_due("http://hook.test/a", 1, CadenceUnit::Hour, nine_am());
        store.insert_task(task.clone());
        let transport = Arc::new(ScriptedTransport::answering(200, "ok"));

        let report = TaskDispatcher::new(
            store.clone(),
            HttpExecutor::new(transport.clone(), std::time::Duration::from_secs(30)),
        )
        .dispatch(task.clone())
        .await;

        assert_eq!(report.errors, vec![DispatchError::RecordStart { task_id: task.id }]);
        assert!(!report.dispatched());
        assert!(transport.calls().is_empty());
        assert_eq!(store.task(task.id).unwrap().scheduled_at, nine_am());
    }

    #[tokio::test]
    async fn finish_failure_still_reschedules() {
        let store = Arc::new(InMemoryTaskStore::new());
        store.fail_on(StoreOp::UpdateExecution);
        let task = task_due("http://hook.test/a", 1, CadenceUnit::Hour, nine_am());
        store.insert_task(task.clone());

        let report = dispatcher(store.clone(), ScriptedTransport::answering(200, "ok"))
            .dispatch(task.clone())
            .await;

        assert!(matches!(
            report.errors.as_slice(),
            [DispatchError::RecordFinish { .. }]
        ));
        assert_eq!(
            store.task(task.id).unwrap().scheduled_at,
            nine_am() + Duration::hours(1)
        );
        assert_eq!(
            store.executions_for(task.id)[0].status,
            ExecutionStatus::Started
        );
    }

    #[tokio::test]
    async fn reschedule_failure_keeps_finalized_execution() {
        let store = Arc::new(InMemoryTaskStore::new());
        store.fail_on(StoreOp::UpdateTaskScheduledAt);
        let task = task_due("http://hook.test/a", 1, CadenceUnit::Hour, nine_am());
        store.insert_task(task.clone());

        let report = dispatcher(store.clone(), ScriptedTransport::answering(204, ""))
            .dispatch(task.clone())
            .await;

        assert_eq!(report.errors, vec![DispatchError::Reschedule { task_id: task.id }]);
        assert_eq!(report.next_run, None);
        assert_eq!(
            store.executions_for(task.id)[0].status,
            ExecutionStatus::Completed
        );
    }

    #[tokio::test]
    async fn request_carries_task_fields() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = task_due("http://hook.test/a", 1, CadenceUnit::Hour, nine_am())
            .with_payload("hello");
        store.insert_task(task.clone());
        let transport = Arc::new(ScriptedTransport::answering(200, "ok"));

        TaskDispatcher::new(
            store,
            HttpExecutor::new(transport.clone(), std::time::Duration::from_secs(30)),
        )
        .dispatch(task)
        .await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://hook.test/a");
        assert_eq!(calls[0].body, "hello");
    }
}

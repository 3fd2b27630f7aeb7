//! Bounded dispatch concurrency.
//!
//! A batch is pushed onto an unbounded queue and drained by a fixed number
//! of workers. Each task runs in its own spawned future so a panic only
//! takes down that task; the worker logs it and moves on.
//!
//! A panicked task is left exactly where the panic stopped it: an execution
//! already recorded as `started` stays `started`, and `scheduled_at` is not
//! advanced, so the task is selected again on the next cycle.

use crate::dispatch::{DispatchReport, TaskDispatcher};
use crate::task::Task;
use futures::future::join_all;
use std::sync::Arc;
use taskhook_core::TaskId;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

/// Result of draining one batch.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// One entry per task whose pipeline ran to completion.
    pub reports: Vec<DispatchReport>,
    /// Tasks whose pipeline panicked.
    pub panicked: Vec<TaskId>,
}

impl DrainReport {
    /// Number of tasks handled, panicked ones included.
    #[must_use]
    pub fn handled(&self) -> usize {
        self.reports.len() + self.panicked.len()
    }
}

/// Drains batches of due tasks with at most `workers` in flight.
#[derive(Clone)]
pub struct DispatchPool {
    dispatcher: Arc<TaskDispatcher>,
    workers: usize,
}

impl DispatchPool {
    #[must_use]
    pub fn new(dispatcher: TaskDispatcher, workers: usize) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Dispatches every task in `batch` exactly once and returns when all
    /// of them are finished.
    pub async fn drain(&self, batch: Vec<Task>) -> DrainReport {
        if batch.is_empty() {
            return DrainReport::default();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for task in batch {
            if tx.send(task).is_err() {
                // rx is held below, so the queue cannot be closed yet.
                error!("dispatch queue closed while enqueueing");
            }
        }
        drop(tx);

        let queue = Arc::new(Mutex::new(rx));
        let workers = (0..self.workers).map(|worker| {
            let queue = queue.clone();
            let dispatcher = self.dispatcher.clone();
            run_worker(worker, queue, dispatcher)
        });

        let mut drained = DrainReport::default();
        for (reports, panicked) in join_all(workers).await {
            drained.reports.extend(reports);
            drained.panicked.extend(panicked);
        }
        drained
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>,
    dispatcher: Arc<TaskDispatcher>,
) -> (Vec<DispatchReport>, Vec<TaskId>) {
    let mut reports = Vec::new();
    let mut panicked = Vec::new();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else { break };
        let task_id = task.id;

        let dispatcher = dispatcher.clone();
        match tokio::spawn(async move { dispatcher.dispatch(task).await }).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(worker, %task_id, error = %e, "task dispatch panicked");
                panicked.push(task_id);
            }
        }
    }

    debug!(worker, handled = reports.len() + panicked.len(), "worker drained");
    (reports, panicked)
}

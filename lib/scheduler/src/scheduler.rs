//! The scheduling loop.
//!
//! A timer task pushes wake signals into a channel with room for exactly
//! one. A single driver receives them and runs cycles back to back, so
//! cycles never overlap and ticks missed during a slow cycle collapse into
//! one immediate follow-up cycle.

use crate::config::SchedulerConfig;
use crate::dispatch::TaskDispatcher;
use crate::error::DispatchError;
use crate::http::{HttpExecutor, HttpTransport};
use crate::pool::{DispatchPool, DrainReport};
use crate::selector::DueTaskSelector;
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use taskhook_core::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, instrument};

/// Summary of one completed cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub due: usize,
    pub drained: DrainReport,
}

impl CycleReport {
    /// Tasks whose pipeline reported at least one error or panicked.
    #[must_use]
    pub fn troubled(&self) -> usize {
        self.drained
            .reports
            .iter()
            .filter(|r| !r.errors.is_empty())
            .count()
            + self.drained.panicked.len()
    }
}

/// Polls for due tasks on a fixed interval and dispatches them.
pub struct Scheduler {
    selector: DueTaskSelector,
    pool: DispatchPool,
    poll_interval: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(selector: DueTaskSelector, pool: DispatchPool, poll_interval: Duration) -> Self {
        Self {
            selector,
            pool,
            poll_interval,
        }
    }

    /// Wires a scheduler from a store, a transport and configuration.
    #[must_use]
    pub fn from_config(
        store: Arc<dyn TaskStore>,
        transport: Arc<dyn HttpTransport>,
        config: &SchedulerConfig,
    ) -> Self {
        let executor = HttpExecutor::new(transport, config.request_timeout());
        let dispatcher = TaskDispatcher::new(store.clone(), executor);
        Self::new(
            DueTaskSelector::new(store),
            DispatchPool::new(dispatcher, config.workers()),
            config.poll_interval(),
        )
    }

    /// Runs one full cycle for `now`: select, dispatch, drain.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Selection` if the due batch could not be
    /// loaded. Nothing is dispatched in that case.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, DispatchError> {
        let batch = match self.selector.select(now).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "failed to select due tasks, skipping cycle");
                return Err(DispatchError::Selection.into());
            }
        };

        let due = batch.len();
        if due == 0 {
            debug!("no tasks due");
            return Ok(CycleReport::default());
        }

        let drained = self.pool.drain(batch).await;
        let report = CycleReport { due, drained };
        info!(
            due,
            dispatched = report.drained.reports.iter().filter(|r| r.dispatched()).count(),
            troubled = report.troubled(),
            "cycle finished"
        );
        Ok(report)
    }

    /// Runs cycles every poll interval until `shutdown` resolves.
    ///
    /// The first cycle starts one interval after this is called. `shutdown`
    /// is only checked between cycles; a running cycle always finishes.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = self.poll_interval;
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);

        let timer = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match wake_tx.try_send(()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(())) => debug!("cycle still running, tick coalesced"),
                    Err(TrySendError::Closed(())) => break,
                }
            }
        });

        info!(
            poll_interval_seconds = period.as_secs(),
            workers = self.pool.workers(),
            "scheduler started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                wake = wake_rx.recv() => {
                    if wake.is_none() {
                        break;
                    }
                    // Errors are already logged inside the cycle.
                    let _ = self.run_cycle(Utc::now()).await;
                }
            }
        }

        timer.abort();
        info!("scheduler stopped");
    }
}

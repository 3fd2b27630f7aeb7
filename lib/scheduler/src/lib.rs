//! Webhook scheduling engine.
//!
//! On every tick the [`Scheduler`] loads the tasks that are due, fans them
//! out over a bounded [`DispatchPool`], and for each task:
//!
//! - records a `started` execution ([`ExecutionRecorder`])
//! - calls the webhook under a timeout ([`HttpExecutor`])
//! - finalizes the execution with the outcome
//! - advances `scheduled_at` by one cadence step ([`Rescheduler`])
//!
//! Storage and network access go through the [`TaskStore`] and
//! [`HttpTransport`] traits.

pub mod cadence;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod http;
pub mod memory;
pub mod pool;
pub mod recorder;
pub mod reschedule;
pub mod scheduler;
pub mod selector;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use cadence::{Cadence, CadenceUnit};
pub use config::SchedulerConfig;
pub use dispatch::{DispatchReport, TaskDispatcher};
pub use error::{DispatchError, RescheduleError, StoreError, TaskError, TransportError};
pub use execution::{Execution, ExecutionStatus, NO_RESPONSE};
pub use http::{HttpExecutor, HttpRequest, HttpResponse, HttpTransport, Outcome, ReqwestTransport};
pub use memory::InMemoryTaskStore;
pub use pool::{DispatchPool, DrainReport};
pub use recorder::ExecutionRecorder;
pub use reschedule::{Rescheduler, next_run};
pub use scheduler::{CycleReport, Scheduler};
pub use selector::DueTaskSelector;
pub use store::TaskStore;
pub use task::{Header, Headers, HttpMethod, Task, TaskStatus};

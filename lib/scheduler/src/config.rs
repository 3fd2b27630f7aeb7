//! Scheduler configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tuning for the scheduling loop, embedded in the server configuration
/// under the `SCHEDULER__` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduling cycles.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Number of concurrent dispatch workers.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Timeout for one webhook request, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_poll_interval_seconds() -> u64 {
    600
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval_seconds(),
            worker_pool_size: default_worker_pool_size(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl SchedulerConfig {
    /// Cycle period. Never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    /// Worker count. Never zero.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.worker_pool_size.max(1)
    }

    /// Per-request timeout. Never zero.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

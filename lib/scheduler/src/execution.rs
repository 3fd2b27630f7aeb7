//! Execution records: the audit trail of dispatch attempts.
//!
//! An execution is written as `started` before the webhook is called and
//! moved exactly once to `completed` or `failed` afterwards.

use crate::error::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use taskhook_core::{ExecutionId, TaskId};

/// Status code recorded when no HTTP response was received.
pub const NO_RESPONSE: u16 = 0;

/// State of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Written before the request is sent.
    Started,
    /// A response with status 1-399 was received.
    Completed,
    /// No response, or a response with status >= 400.
    Failed,
}

impl ExecutionStatus {
    /// Classifies a webhook outcome.
    ///
    /// `0` means the request never got a response and is always a failure.
    #[must_use]
    pub fn from_status_code(status_code: u16) -> Self {
        if status_code == NO_RESPONSE || status_code >= 400 {
            Self::Failed
        } else {
            Self::Completed
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `completed` and `failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(TaskError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// One dispatch attempt of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub task_id: TaskId,
    pub status: ExecutionStatus,
    /// HTTP status of the response, or `0` when none was received.
    pub status_code: u16,
    /// Response body, or a description of the transport failure.
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    /// Creates a `started` execution stamped with the current time.
    #[must_use]
    pub fn started(task_id: TaskId) -> Self {
        Self {
            id: ExecutionId::new(),
            task_id,
            status: ExecutionStatus::Started,
            status_code: NO_RESPONSE,
            response: String::new(),
            created_at: Utc::now(),
        }
    }
}

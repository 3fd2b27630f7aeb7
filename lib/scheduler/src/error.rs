//! Error types for the scheduler crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `TaskError`: Validation of task definitions (cadence, method, headers)
//! - `StoreError`: Failures reported by a `TaskStore` implementation
//! - `TransportError`: Outbound request never produced an HTTP response
//! - `RescheduleError`: Next due time could not be computed or stored
//! - `DispatchError`: Task-scoped failures of one scheduling cycle

use chrono::{DateTime, Utc};
use std::fmt;
use taskhook_core::{ExecutionId, TaskId};

/// Errors from validating task definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Frequency must be a positive integer.
    InvalidFrequency { frequency: i64 },
    /// Unit is not one of the supported cadence units.
    InvalidUnit { unit: String },
    /// Method is not one of the supported HTTP methods.
    InvalidMethod { method: String },
    /// Status is not one of the known task statuses.
    InvalidStatus { status: String },
    /// Header name cannot be sent over HTTP.
    InvalidHeaderName { name: String },
    /// Header value cannot be sent over HTTP.
    InvalidHeaderValue { name: String },
    /// Adding the cadence step leaves the representable timestamp range.
    ScheduleOverflow { scheduled_at: DateTime<Utc> },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrequency { frequency } => {
                write!(f, "frequency must be greater than zero, got {frequency}")
            }
            Self::InvalidUnit { unit } => {
                write!(f, "unit must be 'hour' or 'day', got '{unit}'")
            }
            Self::InvalidMethod { method } => write!(
                f,
                "invalid method '{method}', allowed: GET, POST, DELETE, PUT, OPTIONS"
            ),
            Self::InvalidStatus { status } => {
                write!(f, "status must be 'active', 'paused' or 'disabled', got '{status}'")
            }
            Self::InvalidHeaderName { name } => write!(f, "invalid header name '{name}'"),
            Self::InvalidHeaderValue { name } => {
                write!(f, "invalid value for header '{name}'")
            }
            Self::ScheduleOverflow { scheduled_at } => {
                write!(f, "next run after {scheduled_at} is out of range")
            }
        }
    }
}

impl std::error::Error for TaskError {}

/// Errors from task store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading due tasks failed.
    QueryFailed { reason: String },
    /// Inserting the started execution row failed.
    InsertFailed { reason: String },
    /// Updating a row failed.
    UpdateFailed { reason: String },
    /// A stored row could not be decoded into a domain type.
    Corrupt { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed { reason } => write!(f, "task store query failed: {reason}"),
            Self::InsertFailed { reason } => write!(f, "task store insert failed: {reason}"),
            Self::UpdateFailed { reason } => write!(f, "task store update failed: {reason}"),
            Self::Corrupt { reason } => write!(f, "task store returned a corrupt row: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from sending a webhook request.
///
/// Every variant means no HTTP response was received, which the executor
/// records as status code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be built (bad URL, header, method).
    InvalidRequest { reason: String },
    /// The request did not finish within the configured timeout.
    Timeout { timeout_secs: u64, reason: String },
    /// Connection, DNS, TLS or protocol failure.
    ConnectionFailed { reason: String },
    /// The HTTP client itself could not be created.
    ClientBuild { reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
            Self::Timeout {
                timeout_secs,
                reason,
            } => write!(f, "request timed out after {timeout_secs}s: {reason}"),
            Self::ConnectionFailed { reason } => write!(f, "request failed: {reason}"),
            Self::ClientBuild { reason } => write!(f, "failed to build HTTP client: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors from advancing a task to its next due time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescheduleError {
    /// The next due time is outside the representable range.
    OutOfRange { scheduled_at: DateTime<Utc> },
    /// The new due time could not be written.
    PersistFailed { reason: String },
}

impl fmt::Display for RescheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { scheduled_at } => {
                write!(f, "next run after {scheduled_at} is out of range")
            }
            Self::PersistFailed { reason } => write!(f, "failed to persist next run: {reason}"),
        }
    }
}

impl std::error::Error for RescheduleError {}

/// Task-scoped failures during a scheduling cycle.
///
/// None of these propagate past the task (or, for `Selection`, the cycle)
/// that raised them. They exist so failures can be logged and counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Loading the due batch failed; the cycle was aborted.
    Selection,
    /// The started execution row could not be written; the task was skipped.
    RecordStart { task_id: TaskId },
    /// The execution row could not be finalized.
    RecordFinish {
        task_id: TaskId,
        execution_id: ExecutionId,
    },
    /// The next scheduled time could not be computed or persisted.
    Reschedule { task_id: TaskId },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection => write!(f, "failed to select due tasks"),
            Self::RecordStart { task_id } => {
                write!(f, "failed to record execution start for {task_id}")
            }
            Self::RecordFinish {
                task_id,
                execution_id,
            } => write!(f, "failed to finalize {execution_id} for {task_id}"),
            Self::Reschedule { task_id } => write!(f, "failed to reschedule {task_id}"),
        }
    }
}

impl std::error::Error for DispatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_error_display() {
        let err = TaskError::InvalidFrequency { frequency: 0 };
        assert!(err.to_string().contains("greater than zero"));

        let err = TaskError::InvalidMethod {
            method: "PATCH".to_string(),
        };
        assert!(err.to_string().contains("PATCH"));
    }

    #[test]
    fn transport_timeout_display_mentions_timeout() {
        let err = TransportError::Timeout {
            timeout_secs: 30,
            reason: "operation timed out".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out after 30s"));
    }

    #[test]
    fn client_build_failure_is_not_a_request_error() {
        let err = TransportError::ClientBuild {
            reason: "no TLS backend".to_string(),
        };
        assert_eq!(err.to_string(), "failed to build HTTP client: no TLS backend");
        assert!(!matches!(err, TransportError::InvalidRequest { .. }));
    }

    #[test]
    fn dispatch_error_display() {
        let task_id = TaskId::new();
        let err = DispatchError::RecordStart { task_id };
        assert!(err.to_string().contains(&task_id.to_string()));
    }
}

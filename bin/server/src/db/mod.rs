//! Database repositories for the taskhook service.
//!
//! This module provides data access for:
//! - Services and their API credentials
//! - Task definitions
//! - Execution history
//!
//! [`PgTaskStore`] adapts the repositories to the scheduler's `TaskStore`.

pub mod execution;
pub mod service;
pub mod store;
pub mod task;

pub use execution::ExecutionRepository;
pub use service::{ServiceRecord, ServiceRepository};
pub use store::PgTaskStore;
pub use task::TaskRepository;

/// Builds the error returned when a stored column cannot be decoded.
pub(crate) fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

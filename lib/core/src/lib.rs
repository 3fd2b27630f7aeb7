//! Core types shared across the taskhook workspace.
//!
//! This crate provides the typed identifiers for tasks, executions and
//! services, plus the rootcause-backed `Result` alias every other crate
//! builds its error handling on.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ExecutionId, ParseIdError, ServiceId, TaskId};

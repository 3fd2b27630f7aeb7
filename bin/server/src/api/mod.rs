//! REST API handlers.

pub mod executions;
pub mod tasks;

pub use executions::list_executions;
pub use tasks::{create_task, get_task, list_tasks, update_task};

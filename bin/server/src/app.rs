//! Application state and HTTP routing.

use crate::api;
use axum::{
    Router,
    routing::{get, post},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Database connection pool.
    pub db_pool: PgPool,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tasks", post(api::create_task).get(api::list_tasks))
        .route("/tasks/{task_id}", get(api::get_task).put(api::update_task))
        .route("/tasks/{task_id}/executions", get(api::list_executions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Execution history endpoint.

use super::tasks::parse_task_id;
use crate::app::AppState;
use crate::auth::RequireService;
use crate::db::{ExecutionRepository, TaskRepository};
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskhook_scheduler::Execution;

const DEFAULT_PAGE_SIZE: i64 = 10;

/// Raw paging parameters. Unparsable values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "pageNumber")]
    pub page_number: Option<String>,
    pub count: Option<String>,
}

/// Normalized paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        self.number.saturating_mul(self.size)
    }
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        let number = query
            .page_number
            .and_then(|n| n.trim().parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or(0);
        let size = query
            .count
            .and_then(|n| n.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { number, size }
    }
}

/// One page of a task's executions.
#[derive(Debug, Serialize)]
pub struct ExecutionPage {
    pub total_count: i64,
    pub page_number: i64,
    pub count: i64,
    pub records: Vec<Execution>,
}

/// `GET /tasks/{task_id}/executions`
pub async fn list_executions(
    State(state): State<Arc<AppState>>,
    RequireService(service): RequireService,
    Path(task_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ExecutionPage>, ApiError> {
    let id = parse_task_id(&task_id)?;
    if TaskRepository::new(state.db_pool.clone())
        .find_for_service(id, service.id)
        .await?
        .is_none()
    {
        return Err(ApiError::TaskNotFound { id: task_id });
    }

    let page = Page::from(query);
    let executions = ExecutionRepository::new(state.db_pool.clone());
    let total_count = executions.count_for_task(id).await?;
    let records = executions
        .list_for_task(id, page.size, page.offset())
        .await?;

    Ok(Json(ExecutionPage {
        total_count,
        page_number: page.number,
        count: page.size,
        records,
    }))
}

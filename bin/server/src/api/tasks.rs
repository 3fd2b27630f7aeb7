//! Task endpoints.

use crate::app::AppState;
use crate::auth::RequireService;
use crate::db::TaskRepository;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use taskhook_core::{ServiceId, TaskId};
use taskhook_scheduler::{Cadence, CadenceUnit, Header, Headers, HttpMethod, Task, TaskStatus};

/// Body of `POST /tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub payload: String,
    pub frequency: i64,
    pub unit: String,
    /// First due time. Defaults to one cadence step from now.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl CreateTaskRequest {
    /// Validates the request and builds the task owned by `service_id`.
    pub fn into_task(self, service_id: ServiceId) -> Result<Task, ApiError> {
        if self.url.trim().is_empty() {
            return Err(ApiError::bad_request("url is required"));
        }
        if self.frequency <= 0 {
            return Err(ApiError::bad_request("frequency must be greater than zero"));
        }
        let unit = CadenceUnit::from_str(&self.unit)?;
        let cadence = Cadence::new(self.frequency, unit)?;
        let method = HttpMethod::from_str(&self.method)?;
        let headers = parse_headers(self.headers)?;

        let mut task = Task::new(service_id, self.name, self.url, method, cadence)?
            .with_headers(headers)
            .with_payload(self.payload);
        if let Some(scheduled_at) = self.scheduled_at {
            task = task.scheduled_at(scheduled_at);
        }
        if let Some(status) = self.status {
            task.status = TaskStatus::from_str(&status)?;
        }
        Ok(task)
    }
}

/// Body of `PUT /tasks/{task_id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub payload: Option<String>,
    pub frequency: Option<i64>,
    pub unit: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl UpdateTaskRequest {
    /// Validates every present field, then applies them all to `task`.
    ///
    /// Nothing is changed if any field is invalid.
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut updated = task.clone();

        if let Some(url) = self.url {
            if url.trim().is_empty() {
                return Err(ApiError::bad_request("url is required"));
            }
            updated.url = url;
        }
        if self.frequency.is_some() || self.unit.is_some() {
            let frequency = self
                .frequency
                .unwrap_or_else(|| i64::from(task.cadence.frequency()));
            let unit = match self.unit {
                Some(unit) => CadenceUnit::from_str(&unit)?,
                None => task.cadence.unit(),
            };
            updated.cadence = Cadence::new(frequency, unit)?;
        }
        if let Some(method) = self.method {
            updated.method = HttpMethod::from_str(&method)?;
        }
        if let Some(headers) = self.headers {
            updated.headers = parse_headers(headers)?;
        }
        if let Some(status) = self.status {
            updated.status = TaskStatus::from_str(&status)?;
        }
        if let Some(name) = self.name {
            updated.name = name;
        }
        if let Some(payload) = self.payload {
            updated.payload = payload;
        }
        if let Some(scheduled_at) = self.scheduled_at {
            updated.scheduled_at = scheduled_at;
        }

        updated.updated_at = now;
        *task = updated;
        Ok(())
    }
}

fn parse_headers(headers: Vec<Header>) -> Result<Headers, ApiError> {
    Ok(Headers::parse(
        headers.into_iter().map(|h| (h.name, h.value)),
    )?)
}

pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::from_str(raw).map_err(|_| ApiError::bad_request("invalid task_id"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::bad_request("invalid input")
    })
}

/// `POST /tasks`
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    RequireService(service): RequireService,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = body(payload)?.into_task(service.id)?;

    TaskRepository::new(state.db_pool.clone())
        .create(&task)
        .await?;

    tracing::info!(task_id = %task.id, service_id = %service.id, scheduled_at = %task.scheduled_at, "Created task");
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    RequireService(service): RequireService,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = TaskRepository::new(state.db_pool.clone())
        .list_by_service(service.id)
        .await?;
    Ok(Json(tasks))
}

/// `GET /tasks/{task_id}`
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    RequireService(service): RequireService,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let task = TaskRepository::new(state.db_pool.clone())
        .find_for_service(id, service.id)
        .await?
        .ok_or(ApiError::TaskNotFound { id: task_id })?;
    Ok(Json(task))
}

/// `PUT /tasks/{task_id}`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    RequireService(service): RequireService,
    Path(task_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let request = body(payload)?;

    let repo = TaskRepository::new(state.db_pool.clone());
    let mut task = repo
        .find_for_service(id, service.id)
        .await?
        .ok_or_else(|| ApiError::TaskNotFound {
            id: task_id.clone(),
        })?;

    request.apply(&mut task, Utc::now())?;
    if repo.update(&task).await? == 0 {
        return Err(ApiError::TaskNotFound { id: task_id });
    }

    tracing::info!(task_id = %task.id, "Updated task");
    Ok(Json(task))
}

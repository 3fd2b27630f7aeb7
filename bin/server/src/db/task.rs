//! Database repository for tasks.

use super::decode_error;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use taskhook_core::{ServiceId, TaskId};
use taskhook_scheduler::{Cadence, CadenceUnit, Header, Headers, HttpMethod, Task, TaskStatus};

const TASK_COLUMNS: &str = "id, service_id, name, url, method, headers, payload, frequency, unit, \
                            scheduled_at, status, created_at, updated_at";

/// Row type for task queries.
#[derive(FromRow)]
pub(crate) struct TaskRow {
    id: String,
    service_id: String,
    name: String,
    url: String,
    method: String,
    headers: serde_json::Value,
    payload: String,
    frequency: i64,
    unit: String,
    scheduled_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    pub(crate) fn try_into_task(self) -> Result<Task, sqlx::Error> {
        let id = TaskId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid task id '{}': {}", self.id, e)))?;
        let service_id = ServiceId::from_str(&self.service_id).map_err(|e| {
            decode_error(format!("invalid service id '{}': {}", self.service_id, e))
        })?;
        let method = HttpMethod::from_str(&self.method)
            .map_err(|e| decode_error(format!("task {id}: {e}")))?;
        let unit = CadenceUnit::from_str(&self.unit)
            .map_err(|e| decode_error(format!("task {id}: {e}")))?;
        let cadence = Cadence::new(self.frequency, unit)
            .map_err(|e| decode_error(format!("task {id}: {e}")))?;
        let status = TaskStatus::from_str(&self.status)
            .map_err(|e| decode_error(format!("task {id}: {e}")))?;
        let headers: Vec<Header> = serde_json::from_value(self.headers)
            .map_err(|e| decode_error(format!("task {id}: invalid headers: {e}")))?;

        Ok(Task {
            id,
            service_id,
            name: self.name,
            url: self.url,
            method,
            headers: Headers::from_stored(headers),
            payload: self.payload,
            cadence,
            scheduled_at: self.scheduled_at,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn decode_due(rows: Vec<TaskRow>) -> Vec<Task> {
    rows.into_iter()
        .filter_map(|row| {
            let task_id = row.id.clone();
            match row.try_into_task() {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::error!(%task_id, error = %e, "Skipping undecodable due task");
                    None
                }
            }
        })
        .collect()
}

fn headers_json(task: &Task) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(&task.headers).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Repository for task operations.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Creates a new task repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new task.
    pub async fn create(&self, task: &Task) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, service_id, name, url, method, headers, payload, frequency, unit,
                 scheduled_at, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id.to_string())
        .bind(task.service_id.to_string())
        .bind(&task.name)
        .bind(&task.url)
        .bind(task.method.as_str())
        .bind(headers_json(task)?)
        .bind(&task.payload)
        .bind(i64::from(task.cadence.frequency()))
        .bind(task.cadence.unit().as_str())
        .bind(task.scheduled_at)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces the editable fields of an existing task.
    pub async fn update(&self, task: &Task) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET name = $2, url = $3, method = $4, headers = $5, payload = $6,
                frequency = $7, unit = $8, scheduled_at = $9, status = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.name)
        .bind(&task.url)
        .bind(task.method.as_str())
        .bind(headers_json(task)?)
        .bind(&task.payload)
        .bind(i64::from(task.cadence.frequency()))
        .bind(task.cadence.unit().as_str())
        .bind(task.scheduled_at)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists every task owned by a service, oldest first.
    pub async fn list_by_service(&self, service_id: ServiceId) -> Result<Vec<Task>, sqlx::Error> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE service_id = $1 ORDER BY created_at ASC"
        ))
        .bind(service_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaskRow::try_into_task).collect()
    }

    /// Finds a task, but only if `service_id` owns it.
    pub async fn find_for_service(
        &self,
        id: TaskId,
        service_id: ServiceId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND service_id = $2"
        ))
        .bind(id.to_string())
        .bind(service_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TaskRow::try_into_task).transpose()
    }

    /// Lists active tasks due at or before `now`.
    ///
    /// Rows that fail to decode are logged and left out; only query
    /// failures are returned as errors.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Task>, sqlx::Error> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE scheduled_at <= $1 AND status = 'active'"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_due(rows))
    }

    /// Sets a task's next due time.
    pub async fn update_scheduled_at(
        &self,
        id: TaskId,
        next: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET scheduled_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

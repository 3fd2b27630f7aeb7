//! Database repository for execution history.

use super::decode_error;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::borrow::Cow;
use std::str::FromStr;
use taskhook_core::{ExecutionId, TaskId};
use taskhook_scheduler::{Execution, ExecutionStatus};

/// Row type for execution queries.
#[derive(FromRow)]
struct ExecutionRow {
    id: String,
    task_id: String,
    status: String,
    status_code: i32,
    response: String,
    created_at: DateTime<Utc>,
}

impl ExecutionRow {
    fn try_into_execution(self) -> Result<Execution, sqlx::Error> {
        let id = ExecutionId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid execution id '{}': {}", self.id, e)))?;
        let task_id = TaskId::from_str(&self.task_id)
            .map_err(|e| decode_error(format!("invalid task id '{}': {}", self.task_id, e)))?;
        let status = ExecutionStatus::from_str(&self.status)
            .map_err(|e| decode_error(format!("execution {id}: {e}")))?;
        let status_code = u16::try_from(self.status_code).map_err(|_| {
            decode_error(format!(
                "execution {id}: status code {} out of range",
                self.status_code
            ))
        })?;

        Ok(Execution {
            id,
            task_id,
            status,
            status_code,
            response: self.response,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL `TEXT` cannot hold NUL, so those characters are replaced
/// with U+FFFD before a response body is stored.
fn storable_text(text: &str) -> Cow<'_, str> {
    if text.contains('\0') {
        Cow::Owned(text.replace('\0', "\u{FFFD}"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Repository for execution records.
#[derive(Clone)]
pub struct ExecutionRepository {
    pool: PgPool,
}

impl ExecutionRepository {
    /// Creates a new execution repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an execution row.
    pub async fn create(&self, execution: &Execution) -> Result<(), sqlx::Error> {
        let response = storable_text(&execution.response);
        sqlx::query(
            r#"
            INSERT INTO executions (id, task_id, status, status_code, response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(execution.id.to_string())
        .bind(execution.task_id.to_string())
        .bind(execution.status.as_str())
        .bind(i32::from(execution.status_code))
        .bind(&*response)
        .bind(execution.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finalizes a `started` execution. Returns the number of rows changed,
    /// which is zero if the execution is missing or already finalized.
    pub async fn finish(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        status_code: u16,
        response: &str,
    ) -> Result<u64, sqlx::Error> {
        let response = storable_text(response);
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = $2, status_code = $3, response = $4
            WHERE id = $1 AND status = 'started'
            "#,
        )
        .bind(id.to_string())
        .bind(status.as_str())
        .bind(i32::from(status_code))
        .bind(&*response)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts all executions of a task.
    pub async fn count_for_task(&self, task_id: TaskId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM executions WHERE task_id = $1")
            .bind(task_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lists one page of a task's executions, newest first.
    pub async fn list_for_task(
        &self,
        task_id: TaskId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, task_id, status, status_code, response, created_at
            FROM executions
            WHERE task_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(task_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ExecutionRow::try_into_execution)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_status_code_zero_as_no_response() {
        let row = ExecutionRow {
            id: ExecutionId::new().to_string(),
            task_id: TaskId::new().to_string(),
            status: "failed".to_string(),
            status_code: 0,
            response: "request timed out after 30s: operation timed out".to_string(),
            created_at: Utc::now(),
        };
        let execution = row.try_into_execution().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.status_code, taskhook_scheduler::NO_RESPONSE);
    }

    #[test]
    fn rejects_unknown_status_and_negative_code() {
        let base = || ExecutionRow {
            id: ExecutionId::new().to_string(),
            task_id: TaskId::new().to_string(),
            status: "completed".to_string(),
            status_code: 200,
            response: String::new(),
            created_at: Utc::now(),
        };

        let mut unknown = base();
        unknown.status = "running".to_string();
        assert!(unknown.try_into_execution().is_err());

        let mut negative = base();
        negative.status_code = -1;
        assert!(negative.try_into_execution().is_err());
    }

    #[test]
    fn nul_characters_are_replaced_before_storing() {
        assert_eq!(storable_text("a\0b\0"), "a\u{FFFD}b\u{FFFD}");
        assert!(matches!(storable_text("plain body"), Cow::Borrowed("plain body")));
    }
}

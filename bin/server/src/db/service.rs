//! Database repository for services.

use super::decode_error;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use taskhook_core::ServiceId;

/// A service allowed to manage tasks through the API.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub id: ServiceId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRow {
    fn try_into_record(self) -> Result<ServiceRecord, sqlx::Error> {
        let id = ServiceId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid service id '{}': {}", self.id, e)))?;
        Ok(ServiceRecord {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for service lookups.
pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    /// Creates a new service repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds the service matching both id and token.
    pub async fn find_by_credentials(
        &self,
        id: ServiceId,
        token: &str,
    ) -> Result<Option<ServiceRecord>, sqlx::Error> {
        let row: Option<ServiceRow> = sqlx::query_as(
            r#"
            SELECT id, name, created_at, updated_at
            FROM services
            WHERE id = $1 AND token = $2
            "#,
        )
        .bind(id.to_string())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ServiceRow::try_into_record).transpose()
    }
}

//! Domain error types for the REST API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use taskhook_scheduler::TaskError;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body or a parameter failed validation.
    BadRequest { message: String },
    /// The task does not exist or belongs to another service.
    TaskNotFound { id: String },
    /// Database error while serving the request.
    DatabaseError { details: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::TaskNotFound { .. } => StatusCode::NOT_FOUND,
            Self::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { message } => write!(f, "{message}"),
            Self::TaskNotFound { id } => write!(f, "task '{id}' not found"),
            Self::DatabaseError { details } => write!(f, "database error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TaskError> for ApiError {
    fn from(error: TaskError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        Self::DatabaseError {
            details: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::DatabaseError { details } => {
                tracing::error!(details = %details, "Database error");
                "internal server error".to_string()
            }
            Self::TaskNotFound { .. } => "task not found".to_string(),
            Self::BadRequest { message } => message.clone(),
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

//! Service credential extractor for Axum.

use crate::app::AppState;
use crate::db::{ServiceRecord, ServiceRepository};
use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use std::str::FromStr;
use std::sync::Arc;
use taskhook_core::ServiceId;

/// Header carrying the calling service's id.
pub const SERVICE_ID_HEADER: &str = "service_id";
/// Header carrying the calling service's token.
pub const TOKEN_HEADER: &str = "token";

/// Extractor for requiring valid service credentials.
pub struct RequireService(pub ServiceRecord);

impl<S> FromRequestParts<S> for RequireService
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let (service_id, token) = credentials(&parts.headers)?;

        let service = ServiceRepository::new(app_state.db_pool.clone())
            .find_by_credentials(service_id, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %service_id, "Failed to look up service");
                ServiceRejection::InternalError
            })?
            .ok_or(ServiceRejection::InvalidCredentials)?;

        tracing::debug!(service_id = %service.id, "Validated service");
        Ok(RequireService(service))
    }
}

/// Reads the credential headers without touching the database.
fn credentials(headers: &HeaderMap) -> Result<(ServiceId, String), ServiceRejection> {
    let service_id = headers
        .get(SERVICE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| ServiceId::from_str(v.trim()).ok())
        .ok_or(ServiceRejection::InvalidServiceId)?;

    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token.is_empty() {
        return Err(ServiceRejection::InvalidCredentials);
    }

    Ok((service_id, token.to_string()))
}

/// Rejection type for the service extractor.
#[derive(Debug, PartialEq, Eq)]
pub enum ServiceRejection {
    InvalidServiceId,
    InvalidCredentials,
    InternalError,
}

impl IntoResponse for ServiceRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidServiceId => (StatusCode::BAD_REQUEST, "invalid service_id"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid service credentials"),
            Self::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

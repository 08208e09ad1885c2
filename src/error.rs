use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::store::StoreError;

/// Error taxonomy exposed by the account service. Handlers map each kind to a
/// status code; raw backend errors never cross this boundary.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("email already in use")]
    Conflict,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    Storage(#[source] anyhow::Error),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AccountError::Conflict,
            StoreError::Storage(e) => AccountError::Storage(e),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4();
        let status = match &self {
            AccountError::Validation(_) | AccountError::Conflict => StatusCode::BAD_REQUEST,
            AccountError::Unauthorized => StatusCode::UNAUTHORIZED,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // The stable display message goes to the client; the cause stays in
        // the logs, tied together by the correlation id.
        match &self {
            AccountError::Storage(cause) => {
                error!(%correlation_id, error = %cause, "storage failure")
            }
            other => warn!(%correlation_id, %other, "request failed"),
        }

        let body = Json(json!({
            "error": self.to_string(),
            "correlationId": correlation_id,
        }));
        (status, body).into_response()
    }
}

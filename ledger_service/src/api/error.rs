use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::DomainError;
use serde_json::json;

/// Unified mapping from the crate's one error taxonomy to an HTTP status
/// (§7). Grounded on the teacher's `api/error.rs` `IntoResponse` wrapper,
/// narrowed from its two-service error match to one, since `DomainError`
/// has no per-service overlap left to reconcile.
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            DomainError::InvalidTransaction(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            DomainError::InsufficientBalance => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string()),
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            DomainError::Unauthorized(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            DomainError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            DomainError::Internal(ref e) => {
                tracing::error!("internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

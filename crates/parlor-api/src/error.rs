use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parlor_db::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// HTTP-facing error. Every handler returns this; the store's error kinds
/// map onto it one-to-one, and the response body carries a machine-readable
/// code next to the human message. Clients retry only on timeout/internal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("storage deadline exceeded, safe to retry")]
    Timeout,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_argument",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Forbidden(_) => "permission_denied",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Timeout => "timeout",
            ApiError::Internal => "internal",
        }
    }

    /// spawn_blocking join failures land here.
    pub fn join(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {err}");
        ApiError::Internal
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(msg) => ApiError::Conflict(msg.to_string()),
            StoreError::PermissionDenied(msg) => ApiError::Forbidden(msg.to_string()),
            StoreError::Timeout => ApiError::Timeout,
            StoreError::Internal(msg) => {
                error!("storage failure: {msg}");
                ApiError::Internal
            }
            StoreError::Sqlite(e) => {
                error!("storage failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use parlor_db::StoreError;

    #[test]
    fn store_kinds_map_to_expected_statuses() {
        let cases = [
            (StoreError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::NotFound("poll"), StatusCode::NOT_FOUND),
            (StoreError::Conflict("dup"), StatusCode::CONFLICT),
            (StoreError::PermissionDenied("no"), StatusCode::FORBIDDEN),
            (StoreError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (StoreError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (store, status) in cases {
            assert_eq!(ApiError::from(store).status(), status);
        }
    }
}

// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::store::StoreError;

/// HTTP API error with fixed status codes and client-facing messages.
/// Every variant renders as `{"success": false, "error": <code>, "message": <text>}`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest,

    // 401/400/403 from the auth adapter, carrying its own code and description
    Auth(AuthError),

    // 404 Not Found
    NotFound,

    // 422 Unprocessable Entity (malformed body, constraint violation)
    Unprocessable,

    // 500 Internal Server Error
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest => 400,
            ApiError::Auth(err) => err.status.as_u16(),
            ApiError::NotFound => 404,
            ApiError::Unprocessable => 422,
            ApiError::Internal => 500,
        }
    }

    /// Client-safe message. Auth errors echo the adapter's own description;
    /// everything else uses a canonical phrase.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest => "bad request",
            ApiError::Auth(err) => &err.description,
            ApiError::NotFound => "resource not found",
            ApiError::Unprocessable => "unprocessable",
            ApiError::Internal => "internal server error",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.status_code(),
            "message": self.message(),
        })
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Constraint(msg) => {
                tracing::debug!("constraint violation: {}", msg);
                ApiError::Unprocessable
            }
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("database error: {}", sqlx_err);
                ApiError::Internal
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_status_codes() {
        assert_eq!(ApiError::from(StoreError::NotFound).status_code(), 404);
        assert_eq!(
            ApiError::from(StoreError::Constraint("UNIQUE".into())).status_code(),
            422
        );
        assert_eq!(
            ApiError::from(StoreError::Sqlx(sqlx::Error::PoolClosed)).status_code(),
            500
        );
    }

    #[test]
    fn error_body_carries_numeric_code_and_message() {
        let body = ApiError::NotFound.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 404);
        assert_eq!(body["message"], "resource not found");
    }
}

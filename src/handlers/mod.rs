pub mod drinks;

use crate::error::ApiError;

/// Fallback for unknown routes so 404s share the canonical JSON error body.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

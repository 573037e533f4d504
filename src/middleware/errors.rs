use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Rewrite framework-generated error responses (405 from the method router,
/// 400 from path/extractor rejections) into the canonical JSON error body.
/// Responses that already carry JSON — handler errors, auth errors — pass
/// through untouched.
pub async fn json_error_body(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let already_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.as_bytes().starts_with(b"application/json"))
        .unwrap_or(false);
    if already_json {
        return response;
    }

    let body = json!({
        "success": false,
        "error": status.as_u16(),
        "message": canonical_message(status),
    });
    (status, Json(body)).into_response()
}

fn canonical_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "resource not found",
        405 => "method not allowed",
        422 => "unprocessable",
        500 => "internal server error",
        _ => status.canonical_reason().unwrap_or("error"),
    }
}

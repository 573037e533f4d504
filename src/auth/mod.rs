use axum::http::{header, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod jwks;

pub use jwks::Authenticator;

/// Error raised by the auth adapter. Carries the HTTP status to return, a
/// machine-readable code for logs, and the description echoed to the client.
#[derive(Debug, Clone, Error)]
#[error("{code}: {description}")]
pub struct AuthError {
    pub status: StatusCode,
    pub code: &'static str,
    pub description: String,
}

impl AuthError {
    fn new(status: StatusCode, code: &'static str, description: impl Into<String>) -> Self {
        Self {
            status,
            code,
            description: description.into(),
        }
    }

    pub fn missing_header() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "authorization_header_missing",
            "authorization header is expected",
        )
    }

    pub fn invalid_header(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid_header", description)
    }

    pub fn token_expired() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "token_expired", "token is expired")
    }

    pub fn invalid_claims() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_claims",
            "incorrect claims, check the audience and issuer",
        )
    }

    pub fn permissions_missing() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_claims",
            "permissions claim not included in token",
        )
    }

    pub fn permission_not_found() -> Self {
        Self::new(StatusCode::FORBIDDEN, "unauthorized", "permission not found")
    }

    pub fn keys_unavailable(description: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "jwks_unavailable",
            description,
        )
    }
}

/// Claims extracted from a verified token. Signature, expiry, audience and
/// issuer are checked during decoding; only the permission check remains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

impl Claims {
    /// Confirm the required permission string is present in the token's
    /// `permissions` claim. A token without the claim at all is a 400; a
    /// token with the claim but without the permission is a 403.
    pub fn require_permission(&self, permission: &str) -> Result<(), AuthError> {
        let permissions = self
            .permissions
            .as_ref()
            .ok_or_else(AuthError::permissions_missing)?;
        if permissions.iter().any(|p| p == permission) {
            Ok(())
        } else {
            Err(AuthError::permission_not_found())
        }
    }
}

/// Extract the bearer token from the `Authorization` header. The header must
/// be exactly two whitespace-separated parts with a `Bearer` scheme.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(AuthError::missing_header)?
        .to_str()
        .map_err(|_| AuthError::invalid_header("authorization header is not valid text"))?;

    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => Err(
            AuthError::invalid_header("authorization header must start with Bearer"),
        ),
        (_, None, _) => Err(AuthError::invalid_header("token not found")),
        (_, Some(token), None) => Ok(token),
        _ => Err(AuthError::invalid_header(
            "authorization header must be a bearer token",
        )),
    }
}

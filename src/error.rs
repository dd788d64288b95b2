use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use time::Duration;
use tracing::error;

use crate::store::StoreError;

/// Gateway-level failure taxonomy. Every failure is translated here into a
/// structured JSON response; nothing propagates past the handlers unhandled.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("email already registered")]
    DuplicateEmail,
    /// Unknown email and wrong password collapse into this one outcome so the
    /// response cannot be used to enumerate accounts.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("rate limited")]
    RateLimited { retry_after: Duration },
    #[error("authentication required")]
    MissingToken,
    /// Malformed, forged and expired tokens all surface as this one outcome.
    #[error("invalid or expired token")]
    Unauthorized,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })),
            )
                .into_response(),
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                Json(json!({
                    "success": false,
                    "message": "Email already registered",
                })),
            )
                .into_response(),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "Invalid email or password",
                })),
            )
                .into_response(),
            AuthError::RateLimited { retry_after } => {
                let secs = retry_after.whole_seconds().max(1);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "success": false,
                        "message": "Too many requests, please try again later",
                    })),
                )
                    .into_response();
                if let Ok(value) = secs.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "Authentication required",
                })),
            )
                .into_response(),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "Invalid or expired token",
                })),
            )
                .into_response(),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "message": "User not found",
                })),
            )
                .into_response(),
            AuthError::Internal(e) => {
                error!(error = %e, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Internal server error",
                    })),
                )
                    .into_response()
            }
        }
    }
}

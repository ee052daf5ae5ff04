//! Application error types with Axum response mapping.
//!
//! Each variant maps to a specific HTTP status + JSON body. Session and
//! provider errors convert into the variant that describes them to a client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::provider::ProviderError;
use crate::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token expired")]
    TokenExpired,

    #[error("CSRF validation failed")]
    CsrfFailed(&'static str),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ExpiredToken => AppError::TokenExpired,
            SessionError::MissingCookie => AppError::NotAuthenticated,
            SessionError::InvalidToken(reason) => {
                tracing::debug!(%reason, "Rejected session token");
                AppError::NotAuthenticated
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transport(e) | ProviderError::ProfileTransport(e) => {
                AppError::ProviderUnavailable(e.to_string())
            }
            ProviderError::ClientSecret(msg) => AppError::Internal(msg),
            other => AppError::LoginFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Not authenticated"}),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Token expired"}),
            ),
            AppError::CsrfFailed(reason) => (
                StatusCode::FORBIDDEN,
                json!({"error": "CSRF validation failed", "message": reason}),
            ),
            AppError::LoginFailed(msg) => {
                tracing::warn!(error = %msg, "Login failed");
                (StatusCode::FORBIDDEN, json!({"error": "Login failed"}))
            }
            AppError::ProviderUnavailable(msg) => {
                tracing::warn!(error = %msg, "Identity provider unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({"error": "Identity provider unavailable"}),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal error"}),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! to HTTP responses in the `{success: false, message}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::ConfigError;
use dtai_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No usable bearer token on the request.
    #[error("Token de acceso requerido")]
    Unauthenticated,

    /// The token's signature or embedded expiry failed verification.
    #[error("Token inválido")]
    InvalidToken,

    /// The session store has no live row for this token.
    #[error("Sesión expirada o inválida")]
    SessionExpired,

    /// Login with an unknown email, a deactivated account or a wrong
    /// password. One message for all three, to avoid an account oracle.
    #[error("Credenciales inválidas")]
    InvalidCredentials,

    /// The principal's role or profile status does not match the endpoint.
    #[error("{0}")]
    Forbidden(String),

    /// The addressed resource does not exist (or is not visible to the caller).
    #[error("{0}")]
    NotFound(String),

    /// Missing required fields or a duplicate unique key.
    #[error("{0}")]
    Validation(String),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// Status code and client-facing message for this error. Internal detail
    /// never leaks to the client; it is logged by the response mapping.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Token de acceso requerido".to_string())
            }
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "Token inválido".to_string()),
            ApiError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "Sesión expirada o inválida".to_string())
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Credenciales inválidas".to_string())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Port(PortError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Sesión expirada o inválida".to_string())
            }
            ApiError::Port(PortError::Forbidden(msg)) => (StatusCode::FORBIDDEN, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error interno del servidor".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self:?}");
        }
        let body = Json(json!({ "success": false, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_their_taxonomy_status() {
        let cases = [
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ApiError::SessionExpired, StatusCode::UNAUTHORIZED),
            (
                ApiError::Forbidden("nope".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::NotFound("missing".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Port(PortError::Validation("dup".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_message().0, expected);
        }
    }

    #[test]
    fn internal_faults_never_leak_detail() {
        let (_, message) = ApiError::Internal("secret pool state".to_string()).status_and_message();
        assert_eq!(message, "Error interno del servidor");
    }
}

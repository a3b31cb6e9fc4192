//! Application error type mapping to HTTP status codes and envelope format.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use wagate_types::error::{AddressError, GatewayError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from gateway operations.
    Gateway(GatewayError),
    /// Authentication failure.
    Unauthorized(String),
    /// Malformed request.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        AppError::Gateway(e)
    }
}

impl From<AddressError> for AppError {
    fn from(e: AddressError) -> Self {
        AppError::Gateway(GatewayError::InvalidAddress(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Gateway(e) => match e {
                GatewayError::AlreadyExists(_) => (StatusCode::CONFLICT, "SESSION_EXISTS"),
                GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                GatewayError::NotConnected(_) => (StatusCode::CONFLICT, "SESSION_NOT_CONNECTED"),
                GatewayError::InvalidSessionId(_) => (StatusCode::BAD_REQUEST, "INVALID_SESSION_ID"),
                GatewayError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
                GatewayError::InvalidRules(_) | GatewayError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                GatewayError::PairingUnavailable(_) => (StatusCode::NOT_FOUND, "PAIRING_UNAVAILABLE"),
                GatewayError::ConnectFailed(_) => (StatusCode::BAD_GATEWAY, "CONNECT_FAILED"),
                GatewayError::LogoutFailed(_) => (StatusCode::BAD_GATEWAY, "LOGOUT_FAILED"),
                GatewayError::SendFailed(_) => (StatusCode::BAD_GATEWAY, "SEND_FAILED"),
                GatewayError::QueryFailed(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_QUERY_FAILED"),
                GatewayError::Persistence(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
                }
            },
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Gateway(e) => e.to_string(),
            AppError::Unauthorized(msg) | AppError::Validation(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        } else {
            tracing::debug!(code, error = %message, "request rejected");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

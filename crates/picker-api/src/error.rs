//! API error types and HTTP response mapping.
//!
//! The domain's error taxonomy is recovered here, once, into structured
//! client/server responses; handlers never map individual failures
//! themselves.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use picker_core::Error as CoreError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
}

/// HTTP API error with a stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for authentication failures.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response for conflicts.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Returns an error response for unavailable functionality.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// The client-safe message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CoreError> for ApiError {
    /// The single exhaustive mapping from domain error kinds to HTTP
    /// responses.
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG",
                "Backend data source not available or configured incorrectly",
            ),
            CoreError::DataSource { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATA_SOURCE",
                "Error fetching or processing sheet data",
            ),
            CoreError::MalformedSheet { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SHEET_SCHEMA",
                "Backend data structure error: required columns missing",
            ),
            CoreError::CardNotFound { .. } => Self::new(
                StatusCode::NOT_FOUND,
                "CARD_NOT_FOUND",
                err.to_string(),
            ),
            CoreError::AlreadyReserved {
                ref reserved_by, ..
            } => Self::new(
                StatusCode::CONFLICT,
                "ALREADY_RESERVED",
                format!("Card already reserved by {reserved_by}"),
            ),
            CoreError::ReservationLimit { message } => {
                Self::new(StatusCode::CONFLICT, "RESERVATION_LIMIT", message)
            }
            CoreError::Update { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPDATE_FAILED",
                "Error updating reservation in the sheet",
            ),
            CoreError::InvalidInput(message) => {
                Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
            }
            CoreError::Internal { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "An unexpected server error occurred",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

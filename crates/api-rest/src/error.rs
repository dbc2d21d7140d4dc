//! API errors and their HTTP mapping.

use api_shared::{AuthError, ErrorDetail, ErrorRes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prs_core::{ErrorKind, PatientError, SummaryError};

/// Errors returned by REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Patient(#[from] PatientError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", e.to_string()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Patient(PatientError::SummariesDisabled) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SUMMARIES_DISABLED",
                PatientError::SummariesDisabled.to_string(),
            ),
            ApiError::Patient(PatientError::Summary(e)) => {
                // Upstream messages are passed through verbatim.
                let message = match e {
                    SummaryError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                (StatusCode::BAD_GATEWAY, "SUMMARY_FAILED", message)
            }
            ApiError::Patient(e) => match e.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                ErrorKind::ValidationFailure => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", e.to_string())
                }
                ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT", e.to_string()),
                ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string()),
                ErrorKind::NetworkFailure => {
                    tracing::error!("Store error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorRes {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

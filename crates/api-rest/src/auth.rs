//! Request authentication and the acting staff member.

use crate::error::ApiError;
use crate::AppState;
use api_shared::validate_api_key;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use prs_core::StaffSession;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const STAFF_NAME_HEADER: &str = "x-staff-name";
pub const FACILITY_HEADER: &str = "x-facility";

/// Rejects requests without the configured `x-api-key`.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    validate_api_key(provided, &state.api_key)?;
    Ok(next.run(req).await)
}

/// The staff member acting on a request, from `x-staff-name` and `x-facility`.
///
/// The facility falls back to the server's configured default.
#[derive(Debug, Clone)]
pub struct Staff(pub StaffSession);

#[axum::async_trait]
impl FromRequestParts<AppState> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

        let staff_name = header(STAFF_NAME_HEADER).ok_or_else(|| {
            ApiError::BadRequest(format!("missing {} header", STAFF_NAME_HEADER))
        })?;
        StaffSession::from_parts(staff_name, header(FACILITY_HEADER), &state.default_facility)
            .map(Staff)
            .map_err(|_| ApiError::BadRequest(format!("{} cannot be blank", STAFF_NAME_HEADER)))
    }
}

//! Password login.
//!
//! Flow Overview:
//! 1) Verify the password against the stored digest (or a decoy digest for
//!    unknown emails, so both failures look and cost the same).
//! 2) Issue a session token with the configured lifetime.
//! 3) Return it in a `session_id` cookie.

use super::{CredentialsRequest, credentials_payload};
use crate::api::{
    error::{ApiError, ErrorBody},
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use tracing::info;

#[utoipa::path(
    post,
    path = "/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Session issued in the session_id cookie", body = String),
        (status = 400, description = "Missing or malformed email or password", body = ErrorBody),
        (status = 401, description = "Unknown email or wrong password", body = ErrorBody),
        (status = 429, description = "Too many requests from this address", body = ErrorBody),
        (status = 500, description = "Session store failure", body = ErrorBody),
        (status = 503, description = "Credential or session store unreachable", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    State(services): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = credentials_payload(payload)?;

    let email = services
        .credentials()
        .login(&request.email, &request.password)
        .await?;

    let token = services.sessions().issue(&email).await?;
    let cookie = services
        .sessions()
        .cookie(&token)
        .map_err(|err| ApiError::Internal(format!("Failed to build session cookie: {err}")))?;

    info!("Session issued");

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], "Logged in"))
}

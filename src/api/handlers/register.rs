use super::{CredentialsRequest, credentials_payload};
use crate::api::{
    error::{ApiError, ErrorBody},
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

#[utoipa::path(
    post,
    path = "/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = String),
        (status = 400, description = "Missing or malformed email or password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 429, description = "Too many requests from this address", body = ErrorBody),
        (status = 500, description = "Hashing or store failure", body = ErrorBody),
        (status = 503, description = "Credential store unreachable", body = ErrorBody),
    ),
    tag = "auth"
)]
// axum handler for register
pub async fn register(
    State(services): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = credentials_payload(payload)?;

    services
        .credentials()
        .register(&request.email, &request.password)
        .await?;

    info!("User registered");

    Ok((StatusCode::CREATED, "User registered"))
}

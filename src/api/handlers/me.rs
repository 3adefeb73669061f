use crate::{api::error::ErrorBody, auth::Identity};
use axum::{extract::Extension, response::IntoResponse};

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Greeting for the authenticated identity", body = String),
        (status = 401, description = "Missing, malformed or expired session cookie", body = ErrorBody),
        (status = 503, description = "Session store unreachable", body = ErrorBody),
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    format!("Hello {}", identity.email)
}

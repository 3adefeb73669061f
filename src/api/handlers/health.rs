use crate::{
    GIT_COMMIT_HASH,
    api::state::{AppState, HealthReport},
};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{debug, error};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up; dependency status reported inline", body = HealthReport),
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(State(services): State<AppState>) -> impl IntoResponse {
    let report = services.health().await;
    debug!(
        database = report.database,
        redis = report.redis,
        "Health check completed"
    );

    (StatusCode::OK, app_headers(), Json(report))
}

/// `X-App: name:version:shorthash`, or no header if it cannot be encoded.
fn app_headers() -> HeaderMap {
    let short_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or("");
    let value = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    );

    let mut headers = HeaderMap::new();
    match value.parse::<HeaderValue>() {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => error!("Failed to parse X-App header: {}", err),
    }
    headers
}

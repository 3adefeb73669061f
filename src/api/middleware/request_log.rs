use super::REQUEST_ID_HEADER;
use axum::{extract::Request, middleware::Next, response::Response};
use tokio::time::Instant;
use tracing::info;
use ulid::Ulid;

/// Emit one log line per request after the handler has produced its response.
///
/// `id` is minted here for every request. `request_id` is the propagated
/// `x-request-id`, which callers may set and reuse.
pub async fn record(request: Request, next: Next) -> Response {
    let id = Ulid::new();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| id.to_string(), ToString::to_string);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        id = %id,
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Request completed"
    );
    response
}

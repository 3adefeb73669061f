use crate::api::{error::ApiError, state::AppState};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// Count the request against the client's window and reject once over quota.
pub async fn enforce(State(services): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_address(&request);
    if services.rate_limiter().check(&client).await.forwards() {
        next.run(request).await
    } else {
        ApiError::RateLimited.into_response()
    }
}

/// Raw peer socket address of the connection.
///
/// Clients behind one NAT share a key, and no proxy header is trusted.
pub(crate) fn client_address(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.to_string())
}

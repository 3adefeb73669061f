use crate::store::{memory, postgres::PgCredentialStore, redis::RedisStore};
use anyhow::{Context, Result, anyhow};
use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span, warn};
use ulid::Ulid;

pub mod error;
pub mod handlers;
pub mod middleware;
mod openapi;
pub mod pipeline;
pub mod state;

pub use openapi::openapi;
pub use state::{AppState, AuthConfig, Services};

use middleware::REQUEST_ID_HEADER;
use pipeline::Endpoint;

const DB_CONNECT_ATTEMPTS: u32 = 10;
const DB_CONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Route table. Each endpoint declares the stages it runs behind.
#[must_use]
pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::public("/health", get(handlers::health::health)),
        Endpoint::public("/register", post(handlers::register::register)),
        Endpoint::public("/login", post(handlers::login::login)),
        Endpoint::protected("/me", get(handlers::me::me)),
    ]
}

/// Assemble the full application around `state`.
pub fn app(state: AppState) -> Router {
    pipeline::router(state, endpoints()).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID_HEADER),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID_HEADER,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    )
}

/// In-process stores, for local runs without Postgres or Redis.
///
/// # Errors
/// Returns an error if the services cannot be initialized.
pub async fn in_memory(config: &AuthConfig) -> Result<AppState> {
    let services = Services::new(
        Arc::new(memory::MemoryCredentialStore::new()),
        Arc::new(memory::MemoryKeyValueStore::new()),
        config,
    )
    .await?;
    Ok(Arc::new(services))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: SecretString,
    redis_url: SecretString,
    config: AuthConfig,
) -> Result<()> {
    let pool = connect_database(&dsn).await?;

    let credential_store = PgCredentialStore::new(pool, config.store_timeout());
    credential_store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    let cache = RedisStore::new(redis_url.expose_secret(), config.store_timeout())
        .context("Invalid Redis URL")?;

    let services = Services::new(Arc::new(credential_store), Arc::new(cache), &config).await?;

    serve(port, Arc::new(services)).await
}

/// Bind `[::]:port` and serve until SIGINT or SIGTERM.
///
/// # Errors
/// Return error if the listener cannot be bound or the server fails
pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gracefully shutdown");

    Ok(())
}

async fn connect_database(dsn: &SecretString) -> Result<PgPool> {
    let mut last_error = None;
    for attempt in 1..=DB_CONNECT_ATTEMPTS {
        match PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn.expose_secret())
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(err) => {
                warn!(
                    attempt,
                    max_attempts = DB_CONNECT_ATTEMPTS,
                    "Database not ready: {err}"
                );
                last_error = Some(err);
                if attempt < DB_CONNECT_ATTEMPTS {
                    tokio::time::sleep(DB_CONNECT_BACKOFF).await;
                }
            }
        }
    }
    Err(last_error.map_or_else(
        || anyhow!("Failed to connect to database"),
        |err| anyhow!(err).context("Failed to connect to database"),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!("Failed to install SIGTERM handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

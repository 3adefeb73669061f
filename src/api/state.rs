//! Service configuration and the shared service object.

use crate::{
    auth::{AuthError, Credentials, PasswordHasher, RateLimiter, Sessions},
    store::{CredentialStore, KeyValueStore, StoreError, with_deadline},
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use utoipa::ToSchema;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_MAX: u32 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    session_cookie_secure: bool,
    rate_limit_max: u32,
    rate_limit_window_seconds: u64,
    store_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub const fn with_session_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.session_ttl_seconds = ttl_seconds;
        self
    }

    #[must_use]
    pub const fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub const fn with_rate_limit_max(mut self, max_requests: u32) -> Self {
        self.rate_limit_max = max_requests;
        self
    }

    #[must_use]
    pub const fn with_rate_limit_window_seconds(mut self, window_seconds: u64) -> Self {
        self.rate_limit_window_seconds = window_seconds;
        self
    }

    #[must_use]
    pub const fn with_store_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.store_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub const fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub const fn rate_limit_max(&self) -> u32 {
        self.rate_limit_max
    }

    #[must_use]
    pub const fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_seconds)
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Dependency status reported by `/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthReport {
    pub service: &'static str,
    pub database: &'static str,
    pub redis: &'static str,
}

/// Everything a request needs, built once at start-up and shared by reference.
pub struct Services {
    credentials: Credentials,
    sessions: Sessions,
    rate_limiter: RateLimiter,
}

pub type AppState = Arc<Services>;

impl Services {
    /// # Errors
    /// Returns an error if the credential service cannot be initialized.
    pub async fn new(
        credential_store: Arc<dyn CredentialStore>,
        cache: Arc<dyn KeyValueStore>,
        config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        Self::with_hasher(credential_store, cache, config, PasswordHasher::new()).await
    }

    /// # Errors
    /// Returns an error if the credential service cannot be initialized.
    pub async fn with_hasher(
        credential_store: Arc<dyn CredentialStore>,
        cache: Arc<dyn KeyValueStore>,
        config: &AuthConfig,
        hasher: PasswordHasher,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            credentials: Credentials::new(credential_store, hasher).await?,
            sessions: Sessions::new(
                cache.clone(),
                config.session_ttl(),
                config.session_cookie_secure(),
            ),
            rate_limiter: RateLimiter::new(
                cache,
                config.rate_limit_max(),
                config.rate_limit_window(),
            ),
        })
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub const fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Ping both stores under a short deadline. Never fails.
    pub async fn health(&self) -> HealthReport {
        let (database, redis) = tokio::join!(
            with_deadline(HEALTH_TIMEOUT, "PING postgres", self.credentials.store().ping()),
            with_deadline(HEALTH_TIMEOUT, "PING redis", self.sessions.store().ping()),
        );
        HealthReport {
            service: "up",
            database: status(&database),
            redis: status(&redis),
        }
    }
}

fn status(result: &Result<(), StoreError>) -> &'static str {
    if result.is_ok() { "up" } else { "down" }
}

use crate::{
    api::{self, AuthConfig},
    cli::commands::stores::Backend,
};
use anyhow::Result;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: Backend,
    pub store_timeout_ms: u64,
    pub rate_limit_max: u32,
    pub rate_limit_window_seconds: u64,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_store_timeout_ms(self.store_timeout_ms)
            .with_rate_limit_max(self.rate_limit_max)
            .with_rate_limit_window_seconds(self.rate_limit_window_seconds)
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_session_cookie_secure(self.cookie_secure)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the stores cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.auth_config();
    debug!("Auth config: {:?}", config);

    if !config.session_cookie_secure() {
        warn!("Session cookie is not marked Secure; enable --cookie-secure behind HTTPS");
    }

    match args.backend {
        Backend::External { dsn, redis_url } => api::new(args.port, dsn, redis_url, config).await,
        Backend::InMemory => {
            warn!("Using in-memory stores; state is lost on restart and not shared");
            let state = api::in_memory(&config).await?;
            api::serve(args.port, state).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn args_map_onto_auth_config() {
        let args = Args {
            port: 8080,
            backend: Backend::InMemory,
            store_timeout_ms: 750,
            rate_limit_max: 3,
            rate_limit_window_seconds: 15,
            session_ttl_seconds: 120,
            cookie_secure: true,
        };
        let config = args.auth_config();
        assert_eq!(config.store_timeout(), Duration::from_millis(750));
        assert_eq!(config.rate_limit_max(), 3);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(15));
        assert_eq!(config.session_ttl(), Duration::from_secs(120));
        assert!(config.session_cookie_secure());
    }
}

//! Redis-backed key-value store for sessions and rate counters.

use super::{KeyValueStore, StoreError, with_deadline};
use ::redis::{RedisError, Script, aio::ConnectionManager};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{Instrument, debug, info_span};

// INCR and the first-increment PEXPIRE run as one script so a counter can never
// be left without an expiry.
const INCR_WITH_EXPIRY: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Key-value store on top of a lazily established Redis connection manager.
///
/// The connection is opened on first use so the service can start (and fail
/// open on rate limiting) while Redis is still down.
pub struct RedisStore {
    client: ::redis::Client,
    manager: OnceCell<ConnectionManager>,
    timeout: Duration,
    incr_script: Script,
}

impl RedisStore {
    /// # Errors
    /// Returns an error if the URL cannot be parsed.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url).map_err(map_redis_error)?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
            timeout,
            incr_script: Script::new(INCR_WITH_EXPIRY),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                debug!("Connecting to redis");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(map_redis_error)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, StoreError> {
        let span = info_span!("cache.command", db.system = "redis", db.operation = "INCR");
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        with_deadline(self.timeout, "INCR", async {
            let mut conn = self.connection().await?;
            let count: i64 = self
                .incr_script
                .key(key)
                .arg(window_ms)
                .invoke_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(count)
        })
        .instrument(span)
        .await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let span = info_span!("cache.command", db.system = "redis", db.operation = "SET");
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        with_deadline(self.timeout, "SET", async {
            let mut conn = self.connection().await?;
            let _: () = ::redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(())
        })
        .instrument(span)
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let span = info_span!("cache.command", db.system = "redis", db.operation = "GET");
        with_deadline(self.timeout, "GET", async {
            let mut conn = self.connection().await?;
            let value: Option<String> = ::redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(value)
        })
        .instrument(span)
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = info_span!("cache.command", db.system = "redis", db.operation = "PING");
        with_deadline(self.timeout, "PING redis", async {
            let mut conn = self.connection().await?;
            let _pong: String = ::redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            Ok(())
        })
        .instrument(span)
        .await
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

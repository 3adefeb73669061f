//! Backing stores.
//!
//! The service coordinates concurrent requests only through two stores: a
//! relational credential store whose UNIQUE constraint makes registration
//! atomic, and a fast key-value store with atomic increment and expiry. The
//! service itself holds no locks.
//!
//! Every call made while serving a request is bounded by a deadline; an elapsed
//! deadline surfaces as [`StoreError::Unavailable`] so callers can choose to fail
//! open or closed.

pub mod memory;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use std::{future::Future, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection failure, pool exhaustion or elapsed deadline.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("unique constraint violated")]
    Conflict,
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A persisted account.
#[derive(Clone, Debug)]
pub struct Credential {
    pub id: uuid::Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at_unix: i64,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new credential.
    ///
    /// Returns [`StoreError::Conflict`] when the email is already registered.
    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError>;

    async fn find(&self, email: &str) -> Result<Option<Credential>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically increment `key` and return the new count.
    ///
    /// When the increment creates the key, `window` is attached as its expiry.
    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, StoreError>;

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
    -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Run a store operation, failing fast with [`StoreError::Unavailable`] once
/// `deadline` elapses.
///
/// # Errors
/// Returns the operation's own error, or `Unavailable` on timeout.
pub async fn with_deadline<T, F>(
    deadline: Duration,
    operation: &str,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "{operation} exceeded {}ms deadline",
            deadline.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn with_deadline_times_out_as_unavailable() {
        let result: Result<(), StoreError> =
            with_deadline(Duration::from_millis(50), "GET", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(StoreError::Unavailable(message)) => {
                assert!(message.contains("GET exceeded 50ms deadline"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn with_deadline_passes_through_result() {
        let value = with_deadline(Duration::from_secs(1), "GET", async { Ok(7) }).await;
        assert_eq!(value.ok(), Some(7));

        let conflict: Result<(), StoreError> =
            with_deadline(Duration::from_secs(1), "INSERT", async { Err(StoreError::Conflict) })
                .await;
        assert!(matches!(conflict, Err(StoreError::Conflict)));
    }

    #[test]
    fn only_unavailable_reports_unavailable() {
        assert!(StoreError::Unavailable("down".to_string()).is_unavailable());
        assert!(!StoreError::Conflict.is_unavailable());
        assert!(!StoreError::Backend("bad".to_string()).is_unavailable());
    }
}

//! In-memory stores for single-instance development and tests.
//!
//! Expiry uses `tokio::time::Instant`, so tests can drive windows and session
//! lifetimes with a paused clock.

use super::{Credential, CredentialStore, KeyValueStore, StoreError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{sync::RwLock, time::Instant};
use tracing::debug;
use uuid::Uuid;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        // Check and insert under one write guard, mirroring the UNIQUE constraint.
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(StoreError::Conflict);
        }
        let created_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));
        users.insert(
            email.to_string(),
            Credential {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at_unix,
            },
        );
        Ok(())
    }

    async fn find(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Option<Instant>,
}

impl Entries {
    /// Drop expired entries, at most once per `SWEEP_INTERVAL`.
    fn sweep_if_due(&mut self, now: Instant) {
        if self.next_sweep.is_some_and(|due| now < due) {
            return;
        }
        self.sweep(now);
    }

    fn sweep(&mut self, now: Instant) {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.next_sweep = Some(now + SWEEP_INTERVAL);
        let evicted = before - self.map.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired in-memory entries");
        }
    }
}

/// Key-value store with per-key expiry.
///
/// Expired entries are invisible to reads and are evicted by a sweep that
/// piggybacks on writes.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<Entries>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict every expired entry now.
    pub async fn cleanup(&self) {
        self.entries.write().await.sweep(Instant::now());
    }

    /// Number of stored entries, live or not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        guard.sweep_if_due(now);
        let entries = &mut guard.map;
        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.parse::<i64>());

        match current {
            Some(Ok(previous)) => {
                let count = previous + 1;
                if let Some(entry) = entries.get_mut(key) {
                    entry.value = count.to_string();
                }
                Ok(count)
            }
            Some(Err(_)) => Err(StoreError::Backend(format!(
                "value at {key} is not an integer"
            ))),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: now + window,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sweep_if_due(now);
        entries.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credential_insert_rejects_duplicates() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::new();
        store.insert("a@x.com", "hash").await?;
        assert!(matches!(
            store.insert("a@x.com", "other").await,
            Err(StoreError::Conflict)
        ));

        let found = store.find("a@x.com").await?;
        assert_eq!(found.map(|c| c.password_hash), Some("hash".to_string()));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn counter_expires_after_window() -> Result<(), StoreError> {
        let store = MemoryKeyValueStore::new();
        let window = Duration::from_secs(60);

        assert_eq!(store.incr_with_expiry("k", window).await?, 1);
        assert_eq!(store.incr_with_expiry("k", window).await?, 2);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.incr_with_expiry("k", window).await?, 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.incr_with_expiry("k", window).await?, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() -> Result<(), StoreError> {
        let store = MemoryKeyValueStore::new();
        store
            .set_with_expiry("session:t", "a@x.com", Duration::from_secs(10))
            .await?;
        assert_eq!(store.get("session:t").await?, Some("a@x.com".to_string()));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.get("session:t").await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_evicted_on_write() -> Result<(), StoreError> {
        let store = MemoryKeyValueStore::new();
        let window = Duration::from_secs(60);
        for port in 0..5_000 {
            store
                .incr_with_expiry(&format!("rate_limit:10.0.0.1:{port}"), window)
                .await?;
        }
        assert_eq!(store.len().await, 5_000);

        tokio::time::advance(Duration::from_secs(3_600)).await;
        store.incr_with_expiry("rate_limit:10.0.0.2:1", window).await?;
        store
            .set_with_expiry("session:t", "a@x.com", Duration::from_secs(10))
            .await?;
        assert_eq!(store.get("session:t").await?, Some("a@x.com".to_string()));
        assert_eq!(store.len().await, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_evicts_expired_sessions() -> Result<(), StoreError> {
        let store = MemoryKeyValueStore::new();
        store
            .set_with_expiry("session:short", "a@x.com", Duration::from_secs(10))
            .await?;
        store
            .set_with_expiry("session:long", "b@x.com", Duration::from_secs(100))
            .await?;

        tokio::time::advance(Duration::from_secs(10)).await;
        store.cleanup().await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("session:long").await?, Some("b@x.com".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn incr_on_text_value_is_backend_error() -> Result<(), StoreError> {
        let store = MemoryKeyValueStore::new();
        store
            .set_with_expiry("k", "text", Duration::from_secs(10))
            .await?;
        assert!(matches!(
            store.incr_with_expiry("k", Duration::from_secs(10)).await,
            Err(StoreError::Backend(_))
        ));
        Ok(())
    }
}

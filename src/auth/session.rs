//! Opaque session tokens backed by the key-value store.
//!
//! Flow Overview: login issues a random token and stores `session:<token>`
//! with the identity as value and the session lifetime as expiry. The auth gate
//! reads the `session_id` cookie, resolves it, and hands the identity to the
//! handler as a request extension.

use super::AuthError;
use crate::store::{KeyValueStore, StoreError};
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use std::{sync::Arc, time::Duration};
use tracing::debug;

pub const SESSION_COOKIE_NAME: &str = "session_id";

const SESSION_KEY_PREFIX: &str = "session:";
const TOKEN_BYTES: usize = 32;
// 32 bytes in unpadded base64url.
const TOKEN_LEN: usize = 43;

/// Authenticated identity, valid for the current request only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// No session cookie on the request.
    Missing,
    /// Malformed, unknown or expired token.
    Invalid,
    Resolved(Identity),
}

pub struct Sessions {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    cookie_secure: bool,
}

impl Sessions {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration, cookie_secure: bool) -> Self {
        Self {
            store,
            ttl,
            cookie_secure,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Create a session for `email` and return its token.
    ///
    /// # Errors
    /// Returns an error if the RNG fails or the store rejects the write.
    pub async fn issue(&self, email: &str) -> Result<String, AuthError> {
        let token = generate_session_token()?;
        self.store
            .set_with_expiry(&session_key(&token), email, self.ttl)
            .await?;
        Ok(token)
    }

    /// Look up a token; `None` when unknown or expired.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn resolve(&self, token: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .store
            .get(&session_key(token))
            .await?
            .map(|email| Identity { email }))
    }

    /// Resolve the session cookie carried by `headers`.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<GateOutcome, StoreError> {
        let Some(token) = extract_session_token(headers) else {
            return Ok(GateOutcome::Missing);
        };
        if !well_formed(&token) {
            debug!("Rejected malformed session token");
            return Ok(GateOutcome::Invalid);
        }
        Ok(self
            .resolve(&token)
            .await?
            .map_or(GateOutcome::Invalid, GateOutcome::Resolved))
    }

    /// Build the `Set-Cookie` value for a freshly issued token.
    ///
    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = self.ttl.as_secs();
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Create a new session token from the OS RNG.
///
/// # Errors
/// Returns an error if the OS RNG is unavailable.
pub fn generate_session_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == SESSION_COOKIE_NAME {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryKeyValueStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn sessions(secure: bool) -> Sessions {
        Sessions::new(Arc::new(MemoryKeyValueStore::new()), DAY, secure)
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let first = generate_session_token().unwrap();
        let second = generate_session_token().unwrap();
        assert_ne!(first, second);
        assert!(well_formed(&first));
        assert_eq!(
            Base64UrlUnpadded::decode_vec(&first).map(|bytes| bytes.len()).ok(),
            Some(TOKEN_BYTES)
        );
    }

    #[test]
    fn extracts_session_cookie_among_others() {
        let headers = cookie_headers("theme=dark; session_id=abc ; other=1");
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        assert_eq!(extract_session_token(&cookie_headers("theme=dark")), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = sessions(false).cookie("tok").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session_id=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
        );

        let secure = sessions(true).cookie("tok").unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[tokio::test(start_paused = true)]
    async fn issued_session_resolves_until_expiry() {
        let sessions = sessions(false);
        let token = sessions.issue("a@x.com").await.unwrap();
        let headers = cookie_headers(&format!("session_id={token}"));

        assert_eq!(
            sessions.authenticate(&headers).await.unwrap(),
            GateOutcome::Resolved(Identity {
                email: "a@x.com".to_string()
            })
        );

        tokio::time::advance(DAY - Duration::from_secs(1)).await;
        assert!(matches!(
            sessions.authenticate(&headers).await.unwrap(),
            GateOutcome::Resolved(_)
        ));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            sessions.authenticate(&headers).await.unwrap(),
            GateOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn missing_and_malformed_cookies() {
        let sessions = sessions(false);
        assert_eq!(
            sessions.authenticate(&HeaderMap::new()).await.unwrap(),
            GateOutcome::Missing
        );
        assert_eq!(
            sessions
                .authenticate(&cookie_headers("session_id=not-a-token"))
                .await
                .unwrap(),
            GateOutcome::Invalid
        );
        assert_eq!(
            sessions
                .authenticate(&cookie_headers("session_id="))
                .await
                .unwrap(),
            GateOutcome::Invalid
        );
        let unknown = generate_session_token().unwrap();
        assert_eq!(
            sessions
                .authenticate(&cookie_headers(&format!("session_id={unknown}")))
                .await
                .unwrap(),
            GateOutcome::Invalid
        );
    }
}

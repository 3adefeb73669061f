//! Account registration and credential verification.

use super::{AuthError, PasswordHasher};
use crate::store::{CredentialStore, StoreError};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub struct Credentials {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    // Verified against when the email is unknown, so both login failures cost
    // one slow-hash comparison.
    decoy_hash: String,
}

impl Credentials {
    /// # Errors
    /// Returns an error if the decoy digest cannot be computed.
    pub async fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
    ) -> Result<Self, AuthError> {
        let mut decoy = [0u8; 16];
        OsRng.try_fill_bytes(&mut decoy)?;
        let decoy_hash = hasher.hash(format!("{decoy:?}")).await?;
        Ok(Self {
            store,
            hasher,
            decoy_hash,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create an account.
    ///
    /// Uniqueness is enforced by the store, so two racing registrations for the
    /// same email produce exactly one success and one [`AuthError::Conflict`].
    ///
    /// # Errors
    /// `Validation` for missing or malformed input, `Conflict` for a taken
    /// email, and store or hashing errors otherwise.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required"));
        }
        if !valid_email(&email) {
            return Err(AuthError::Validation("Invalid email"));
        }

        let digest = self.hasher.hash(password.to_string()).await?;

        match self.store.insert(&email, &digest).await {
            Ok(()) => {
                debug!("Registered {email}");
                Ok(())
            }
            Err(StoreError::Conflict) => Err(AuthError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    /// Verify a login attempt and return the normalized identity.
    ///
    /// Unknown emails and wrong passwords both end in
    /// [`AuthError::InvalidCredentials`] after exactly one hash verification.
    ///
    /// # Errors
    /// `Validation` for missing input, `InvalidCredentials` on mismatch, and
    /// store errors (fail closed) otherwise.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required"));
        }

        let stored = self.store.find(&email).await?;

        let (digest, known) = match stored {
            Some(credential) => (credential.password_hash, true),
            None => (self.decoy_hash.clone(), false),
        };

        let matches = self.hasher.verify(password.to_string(), digest).await?;

        if known && matches {
            Ok(email)
        } else {
            debug!("Rejected login attempt");
            Err(AuthError::InvalidCredentials)
        }
    }
}

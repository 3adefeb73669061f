//! Password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("password hashing failed")]
    Hash,
    #[error("password hashing task failed")]
    Join,
}

/// Slow, salted password digest.
///
/// Work happens on the blocking pool so concurrent logins do not starve the
/// runtime. Digests are PHC strings, so verification reads its parameters
/// from the stored hash.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Argon2id with the OWASP baseline (19 MiB, 2 passes, 1 lane).
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::DEFAULT,
        }
    }

    /// # Errors
    /// Returns an error if argon2 rejects the parameters.
    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|err| PasswordError::Params(err.to_string()))?;
        Ok(Self { params })
    }

    /// # Errors
    /// Returns an error if hashing fails or the blocking task panics.
    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|err| {
            error!("Password hash task failed: {err}");
            PasswordError::Join
        })?
        .map_err(|err| {
            error!("Failed to hash password: {err}");
            PasswordError::Hash
        })
    }

    /// Compare `password` against a stored digest.
    ///
    /// An unparseable digest verifies as `false`.
    ///
    /// # Errors
    /// Returns an error if the blocking task panics.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, PasswordError> {
        tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                error!("Stored password hash is not a valid PHC string");
                return false;
            };
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .await
        .map_err(|err| {
            error!("Password verify task failed: {err}");
            PasswordError::Join
        })
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

//! Credential, session and rate-limit state machines.
//!
//! Failure policy differs per component. The rate limiter fails open when its
//! counter store is unavailable; credential checks and session resolution fail
//! closed.

mod credentials;
mod password;
mod rate_limit;
mod session;

pub use credentials::{Credentials, normalize_email, valid_email};
pub use password::{PasswordError, PasswordHasher};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use session::{
    GateOutcome, Identity, SESSION_COOKIE_NAME, Sessions, extract_session_token,
    generate_session_token,
};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("email already registered")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("failed to generate session token: {0}")]
    Token(#[from] rand::Error),
}

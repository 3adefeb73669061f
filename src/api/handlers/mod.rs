//! Route handlers.
//!
//! Handlers assume the pipeline already ran: requests reaching them are within
//! quota, and protected handlers find an [`Identity`](crate::auth::Identity)
//! in the request extensions.

pub mod health;
pub mod login;
pub mod me;
pub mod register;

use super::error::ApiError;
use axum::{Json, extract::rejection::JsonRejection};
use serde::Deserialize;
use std::fmt;
use tracing::debug;
use utoipa::ToSchema;

/// Body shared by `/register` and `/login`.
#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Turn a body rejection into a 400 without echoing parser details.
pub(crate) fn credentials_payload(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, ApiError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        debug!("Rejected request body: {rejection}");
        ApiError::Validation("Invalid request")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_password() {
        let request = CredentialsRequest {
            email: "a@x.com".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{request:?}");
        assert!(printed.contains("a@x.com"));
        assert!(!printed.contains("hunter2"));
    }
}

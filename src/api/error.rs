//! HTTP error taxonomy.
//!
//! Every failure leaves the service as a status plus a stable `error` code.
//! Causes of 5xx responses go to the log only.

use crate::{auth::AuthError, store::StoreError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnauthorizedReason {
    InvalidCredentials,
    MissingSession,
    InvalidSession,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("User already exists")]
    Conflict,
    #[error("unauthorized: {0:?}")]
    Unauthorized(UnauthorizedReason),
    #[error("Too Many Requests")]
    RateLimited,
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_request",
            Self::Conflict => "conflict",
            Self::Unauthorized(UnauthorizedReason::InvalidCredentials) => "invalid_credentials",
            Self::Unauthorized(UnauthorizedReason::MissingSession) => "unauthorized",
            Self::Unauthorized(UnauthorizedReason::InvalidSession) => "session_invalid",
            Self::RateLimited => "rate_limited",
            Self::Upstream(_) => "upstream_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::Validation(reason) => *reason,
            Self::Conflict => "User already exists",
            Self::Unauthorized(UnauthorizedReason::InvalidCredentials) => "Invalid credentials",
            Self::Unauthorized(UnauthorizedReason::MissingSession) => "Unauthorized",
            Self::Unauthorized(UnauthorizedReason::InvalidSession) => {
                "Session expired or invalid"
            }
            Self::RateLimited => "Too Many Requests",
            Self::Upstream(_) => "Service temporarily unavailable",
            Self::Internal(_) => "Server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(detail) => error!("Upstream unavailable: {detail}"),
            Self::Internal(detail) => error!("Internal error: {detail}"),
            _ => (),
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => Self::Upstream(detail),
            StoreError::Conflict => Self::Conflict,
            StoreError::Backend(detail) => Self::Internal(detail),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(reason) => Self::Validation(reason),
            AuthError::Conflict => Self::Conflict,
            AuthError::InvalidCredentials => {
                Self::Unauthorized(UnauthorizedReason::InvalidCredentials)
            }
            AuthError::Store(err) => err.into(),
            AuthError::Password(err) => Self::Internal(err.to_string()),
            AuthError::Token(err) => Self::Internal(err.to_string()),
        }
    }
}

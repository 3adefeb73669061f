use crate::{
    api::{
        error::{ApiError, UnauthorizedReason},
        state::AppState,
    },
    auth::GateOutcome,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Admit only requests carrying a live session and attach its identity.
///
/// A session store failure rejects the request with 503.
pub async fn require_session(
    State(services): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match services.sessions().authenticate(request.headers()).await? {
        GateOutcome::Missing => Err(ApiError::Unauthorized(UnauthorizedReason::MissingSession)),
        GateOutcome::Invalid => Err(ApiError::Unauthorized(UnauthorizedReason::InvalidSession)),
        GateOutcome::Resolved(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::state::{AuthConfig, Services},
        auth::{Identity, PasswordHasher},
        store::memory::{MemoryCredentialStore, MemoryKeyValueStore},
    };
    use axum::{
        Extension, Router,
        body::{Body, to_bytes},
        http::{Request as HttpRequest, StatusCode, header::COOKIE},
        middleware::from_fn_with_state,
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn services() -> AppState {
        Arc::new(
            Services::with_hasher(
                Arc::new(MemoryCredentialStore::new()),
                Arc::new(MemoryKeyValueStore::new()),
                &AuthConfig::new(),
                PasswordHasher::with_params(1024, 1, 1).unwrap(),
            )
            .await
            .unwrap(),
        )
    }

    fn app(services: AppState) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(identity): Extension<Identity>| async move { identity.email }),
            )
            .layer(from_fn_with_state(services, require_session))
    }

    async fn call(app: Router, cookie: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn resolved_session_reaches_handler() {
        let services = services().await;
        let token = services.sessions().issue("a@x.com").await.unwrap();

        let (status, body) = call(app(services), Some(&format!("session_id={token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@x.com");
    }

    #[tokio::test]
    async fn missing_and_invalid_sessions_are_rejected() {
        let services = services().await;

        let (status, body) = call(app(services.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"unauthorized\""));

        let (status, body) = call(app(services.clone()), Some("session_id=not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("session_invalid"));

        let unknown = crate::auth::generate_session_token().unwrap();
        let (status, _) = call(app(services), Some(&format!("session_id={unknown}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

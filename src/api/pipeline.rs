//! Declarative middleware chain.
//!
//! Endpoints list the stages they need; [`compose`] applies them around the
//! handler in the canonical order no matter how they were declared:
//!
//! ```text
//! RateLimit -> RequestLog -> AuthGate -> handler
//! ```
//!
//! Rate limiting runs before any hashing or store lookups. Request logging sits
//! inside the limiter and outside the auth gate, so it reports the outcome the
//! client actually saw, including auth rejections.

use super::{middleware, state::AppState};
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state, routing::MethodRouter};

/// A decorator in the pipeline. Variant order is the wrapping order, outermost
/// first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    RateLimit,
    RequestLog,
    AuthGate,
}

pub struct Endpoint {
    path: &'static str,
    route: MethodRouter<AppState>,
    stages: Vec<Stage>,
}

impl Endpoint {
    #[must_use]
    pub fn new(path: &'static str, route: MethodRouter<AppState>) -> Self {
        Self {
            path,
            route,
            stages: Vec::new(),
        }
    }

    /// Rate-limited and logged.
    #[must_use]
    pub fn public(path: &'static str, route: MethodRouter<AppState>) -> Self {
        Self::new(path, route)
            .with(Stage::RateLimit)
            .with(Stage::RequestLog)
    }

    /// Rate-limited, logged and behind the session gate.
    #[must_use]
    pub fn protected(path: &'static str, route: MethodRouter<AppState>) -> Self {
        Self::public(path, route).with(Stage::AuthGate)
    }

    #[must_use]
    pub fn with(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        canonical(&self.stages)
    }
}

/// Sort and deduplicate stages into wrapping order.
fn canonical(stages: &[Stage]) -> Vec<Stage> {
    let mut ordered = stages.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}

/// Wrap `route` with `stages`, outermost first.
#[must_use]
pub fn compose(
    route: MethodRouter<AppState>,
    stages: &[Stage],
    state: &AppState,
) -> MethodRouter<AppState> {
    // Apply innermost first so the first stage ends up outermost.
    canonical(stages)
        .into_iter()
        .rev()
        .fold(route, |route, stage| match stage {
            Stage::RateLimit => route.layer(from_fn_with_state(
                state.clone(),
                middleware::rate_limit::enforce,
            )),
            Stage::RequestLog => route.layer(from_fn(middleware::request_log::record)),
            Stage::AuthGate => route.layer(from_fn_with_state(
                state.clone(),
                middleware::auth_gate::require_session,
            )),
        })
}

/// Mount every endpoint with its composed chain.
#[must_use]
pub fn router(state: AppState, endpoints: Vec<Endpoint>) -> Router {
    endpoints
        .into_iter()
        .fold(Router::new(), |router, endpoint| {
            let stages = endpoint.stages();
            router.route(endpoint.path, compose(endpoint.route, &stages, &state))
        })
        .with_state(state)
}

//! # Warden (session authentication service)
//!
//! `warden` registers accounts, verifies credentials, issues opaque session
//! tokens and rate-limits every endpoint.
//!
//! ## Request pipeline
//!
//! Every request passes through a fixed chain of decorators before it reaches
//! an endpoint:
//!
//! 1. **Rate limiting** counts requests per client address in a fixed window
//!    (`rate_limit:<addr>`, 10 requests per 60 seconds by default). When the
//!    counter store is unreachable the limiter fails open.
//! 2. **Request logging** emits one structured line per request with the final
//!    status and elapsed time.
//! 3. **Auth gate** (protected endpoints only) resolves the `session_id` cookie
//!    into an [`auth::Identity`] request extension. Store failures fail closed.
//!
//! ## Stores
//!
//! Credentials live in Postgres (`users` table, unique email). Sessions and
//! rate counters live in Redis with native expiry. Both sit behind traits in
//! [`store`] so the whole pipeline runs against in-memory doubles in tests.
//!
//! ## Known weakness
//!
//! The rate-limit key is the raw peer socket address. Clients behind a shared
//! NAT share a quota, and there is no trusted proxy header support.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

//! Pipeline stages. Each one is a plain decorator with no knowledge of the
//! endpoint it wraps.

pub mod auth_gate;
pub mod rate_limit;
pub mod request_log;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, with every option already
//! converted to its typed form.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, limits, stores};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let store_opts = stores::Options::parse(matches)?;
    let limit_opts = limits::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        backend: store_opts.backend,
        store_timeout_ms: store_opts.timeout_ms,
        rate_limit_max: limit_opts.rate_limit_max,
        rate_limit_window_seconds: limit_opts.rate_limit_window_seconds,
        session_ttl_seconds: limit_opts.session_ttl_seconds,
        cookie_secure: limit_opts.cookie_secure,
    }))
}

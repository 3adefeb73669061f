use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_RATE_LIMIT_MAX: &str = "rate-limit-max";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub rate_limit_max: u32,
    pub rate_limit_window_seconds: u64,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse rate-limit and session options from CLI matches.
    ///
    /// # Errors
    /// Returns an error if any window, quota or lifetime is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let positive = |id: &str, default: u64| -> anyhow::Result<u64> {
            let value = matches.get_one::<u64>(id).copied().unwrap_or(default);
            if value == 0 {
                anyhow::bail!("--{id} must be greater than zero");
            }
            Ok(value)
        };

        let rate_limit_max = matches
            .get_one::<u32>(ARG_RATE_LIMIT_MAX)
            .copied()
            .unwrap_or(10);
        if rate_limit_max == 0 {
            anyhow::bail!("--{ARG_RATE_LIMIT_MAX} must be greater than zero");
        }

        Ok(Self {
            rate_limit_max,
            rate_limit_window_seconds: positive(ARG_RATE_LIMIT_WINDOW_SECONDS, 60)?,
            session_ttl_seconds: positive(ARG_SESSION_TTL_SECONDS, 86_400)?,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX)
                .long(ARG_RATE_LIMIT_MAX)
                .help("Requests allowed per client address in each window")
                .env("WARDEN_RATE_LIMIT_MAX")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Rate-limit window length in seconds")
                .env("WARDEN_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds, also the cookie Max-Age")
                .env("WARDEN_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS deployments)")
                .env("WARDEN_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}

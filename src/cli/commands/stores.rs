//! Backing store arguments: Postgres DSN, Redis URL and the per-call deadline.

use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_DSN: &str = "dsn";
pub const ARG_REDIS_URL: &str = "redis-url";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";
pub const ARG_IN_MEMORY: &str = "in-memory";

#[derive(Debug)]
pub enum Backend {
    External {
        dsn: SecretString,
        redis_url: SecretString,
    },
    InMemory,
}

#[derive(Debug)]
pub struct Options {
    pub backend: Backend,
    pub timeout_ms: u64,
}

impl Options {
    /// Parse store options from CLI matches.
    ///
    /// # Errors
    /// Returns an error if `--dsn` is missing without `--in-memory`, or the
    /// timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let timeout_ms = matches
            .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
            .copied()
            .unwrap_or(2_000);
        if timeout_ms == 0 {
            anyhow::bail!("--{ARG_STORE_TIMEOUT_MS} must be greater than zero");
        }

        if matches.get_flag(ARG_IN_MEMORY) {
            return Ok(Self {
                backend: Backend::InMemory,
                timeout_ms,
            });
        }

        let dsn = match matches.get_one::<String>(ARG_DSN) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_DSN}"),
        };
        let redis_url = matches
            .get_one::<String>(ARG_REDIS_URL)
            .cloned()
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        Ok(Self {
            backend: Backend::External {
                dsn,
                redis_url: SecretString::from(redis_url),
            },
            timeout_ms,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("WARDEN_DSN")
                .required_unless_present(ARG_IN_MEMORY),
        )
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long(ARG_REDIS_URL)
                .help("Redis URL for sessions and rate-limit counters")
                .env("WARDEN_REDIS_URL")
                .default_value("redis://127.0.0.1:6379"),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Deadline in milliseconds for each store call")
                .env("WARDEN_STORE_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_IN_MEMORY)
                .long(ARG_IN_MEMORY)
                .help("Keep credentials, sessions and counters in process memory (single instance only)")
                .env("WARDEN_IN_MEMORY")
                .action(ArgAction::SetTrue)
                .conflicts_with(ARG_DSN),
        )
}

use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

use crate::session::{ExpirationPolicy, SessionConfig};

pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_SESSION_EXPIRATION: &str = "session-expiration";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds")
                .env("RPCGATE_SESSION_TTL")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_EXPIRATION)
                .long(ARG_SESSION_EXPIRATION)
                .help("Session expiration policy")
                .long_help(
                    "Session expiration policy. `fixed` expires a session TTL seconds after sign-in; `sliding` pushes expiry forward on every authenticated request.",
                )
                .env("RPCGATE_SESSION_EXPIRATION")
                .default_value("fixed")
                .value_parser(["fixed", "sliding"]),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Timeout for a single session store call, in milliseconds")
                .env("RPCGATE_STORE_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub ttl_seconds: u64,
    pub expiration: ExpirationPolicy,
    pub store_timeout_ms: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a session argument is missing or malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let ttl_seconds = matches
            .get_one::<u64>(ARG_SESSION_TTL)
            .copied()
            .context("missing required argument: --session-ttl")?;
        let expiration = matches
            .get_one::<String>(ARG_SESSION_EXPIRATION)
            .context("missing required argument: --session-expiration")?
            .parse::<ExpirationPolicy>()
            .map_err(|err| anyhow!(err))?;
        let store_timeout_ms = matches
            .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
            .copied()
            .context("missing required argument: --store-timeout-ms")?;

        Ok(Self {
            ttl_seconds,
            expiration,
            store_timeout_ms,
        })
    }

    #[must_use]
    pub fn into_config(self, secure_cookie: bool) -> SessionConfig {
        SessionConfig::default()
            .with_ttl(Duration::from_secs(self.ttl_seconds))
            .with_expiration(self.expiration)
            .with_store_timeout(Duration::from_millis(self.store_timeout_ms))
            .with_secure_cookie(secure_cookie)
    }
}

//! Map validated CLI arguments onto an [`Action`] with its full configuration.

use crate::cli::actions::Action;
use crate::cli::commands::{ARG_CORS_ORIGIN, ARG_DSN, ARG_PORT, ARG_PRODUCTION, session};
use crate::cli::globals::GatewayConfig;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let production = matches.get_flag(ARG_PRODUCTION);
    let cors_origin = matches.get_one::<String>(ARG_CORS_ORIGIN).cloned();

    // Secure cookies follow production mode.
    let session = session::Options::parse(matches)?.into_config(production);

    Ok(Action::Server(GatewayConfig {
        port,
        dsn: SecretString::from(dsn),
        production,
        cors_origin,
        session,
    }))
}

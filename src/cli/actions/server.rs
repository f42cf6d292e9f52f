use crate::{api, cli::globals::GatewayConfig};
use anyhow::Result;
use secrecy::ExposeSecret;
use tracing::{debug, info};
use url::Url;

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(config: GatewayConfig) -> Result<()> {
    debug!("Gateway config: {:?}", config);

    if let Some(host) = dsn_host(&config) {
        info!("Using database at {host}");
    }

    api::new(&config).await
}

fn dsn_host(config: &GatewayConfig) -> Option<String> {
    let dsn = Url::parse(config.dsn.expose_secret()).ok()?;
    let host = dsn.host_str()?;
    Some(dsn.port().map_or_else(|| host.to_string(), |port| format!("{host}:{port}")))
}

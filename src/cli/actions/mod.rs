pub mod server;

use crate::cli::globals::GatewayConfig;

#[derive(Debug)]
pub enum Action {
    Server(GatewayConfig),
}

//! HTTP handlers for the gateway.

pub mod health;
pub mod rpc;

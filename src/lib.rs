//! # rpcgate (Session-Authenticated RPC Gateway)
//!
//! `rpcgate` accepts typed RPC calls over HTTP, resolves an optional
//! authenticated identity from an opaque session cookie, and lets individual
//! procedures declare that they require that identity.
//!
//! ## Request Flow
//!
//! 1. The session cookie (`sessionId`) is extracted from the request headers.
//! 2. The id is resolved against the [`session::SessionStore`] (at most one lookup).
//! 3. A fixed-shape [`rpc::RequestContext`] is built from the session, a
//!    response-header sink and the request span.
//! 4. The interceptor chain runs: logging is always outermost, authorization
//!    wraps protected procedures only.
//! 5. Failures are translated exactly once by the [`rpc::ErrorNormalizer`].
//!
//! ## Sessions
//!
//! Sessions live in a shared key-value store under `sess:<id>` with a fixed
//! TTL. Reads never extend the TTL unless the sliding expiration policy is
//! configured. A store outage is never reported as "not logged in": it is an
//! internal error for the client and a distinct condition in the logs.

pub mod api;
pub mod auth;
pub mod cli;
pub mod rpc;
pub mod session;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

//! Session cookie encoding and extraction.
//!
//! The session id only ever travels in the `sessionId` cookie: never in a
//! URL, a query string or a response body.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use std::time::Duration;

use super::SessionId;

pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Attributes for the `Set-Cookie` values issued by the gateway.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    max_age_seconds: u64,
    secure: bool,
}

impl SessionCookie {
    #[must_use]
    pub fn new(max_age: Duration, secure: bool) -> Self {
        Self {
            max_age_seconds: max_age.as_secs(),
            secure,
        }
    }

    /// Find the session id in the request's `Cookie` headers.
    ///
    /// Pairs are split on `;` and matched on the exact cookie name. The first
    /// `sessionId` pair decides: if its value is malformed the request is
    /// treated as carrying no session, later duplicates are ignored.
    #[must_use]
    pub fn extract(headers: &HeaderMap) -> Option<SessionId> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == SESSION_COOKIE_NAME)
            .map(|(_, value)| value.trim())?;

        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        SessionId::parse(unquoted)
    }

    /// Build the `Set-Cookie` value that hands a new session to the client.
    pub fn encode_set(&self, id: &SessionId) -> Result<HeaderValue, InvalidHeaderValue> {
        self.encode(id.as_str(), self.max_age_seconds)
    }

    /// Build the `Set-Cookie` value that tells the client to drop the cookie.
    pub fn encode_clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        self.encode("", 0)
    }

    fn encode(&self, value: &str, max_age: u64) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

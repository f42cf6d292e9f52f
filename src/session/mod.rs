//! Session identifiers, stored records, and the stores that keep them.
//!
//! A session is a single key in a shared key-value store: `sess:<id>` maps to
//! a JSON object holding at least `userId`. The store enforces expiry; nothing
//! in this crate sweeps or polls for expired entries.

mod cookie;
mod manager;
mod memory;
mod postgres;
mod store;

pub use cookie::{SESSION_COOKIE_NAME, SessionCookie};
pub use manager::{ExpirationPolicy, SessionConfig, SessionManager};
pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;
pub use store::{SessionStore, StoreError};

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Key prefix for every session entry in the backing store.
pub const SESSION_KEY_PREFIX: &str = "sess:";

const SESSION_ID_BYTES: usize = 32;
const SESSION_ID_MAX_LEN: usize = 128;

/// Opaque, unguessable session token.
///
/// The raw value only ever travels in the session cookie; `Debug` output is
/// truncated so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Create a fresh token from 32 random bytes (URL-safe base64, no padding).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept a token presented by a client.
    ///
    /// Only non-empty URL-safe base64 alphabets are accepted, anything else is
    /// treated as if no token was sent.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= SESSION_ID_MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the session is stored.
    #[must_use]
    pub fn store_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}…)")
    }
}

/// Payload stored for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(user_id: Uuid, data: Option<Value>) -> Self {
        Self { user_id, data }
    }
}

/// A resolved session, copied out of the store at lookup time.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    id: SessionId,
    record: SessionRecord,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, record: SessionRecord) -> Self {
        Self { id, record }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.record.user_id
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.record.data.as_ref()
    }

    #[must_use]
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    #[test]
    fn generate_produces_32_random_bytes() {
        let id = SessionId::generate();
        let decoded = URL_SAFE_NO_PAD.decode(id.as_str().as_bytes()).ok();
        assert_eq!(decoded.map(|bytes| bytes.len()), Some(32));
    }

    #[test]
    fn generate_is_unique() {
        let first = SessionId::generate();
        let second = SessionId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn parse_rejects_foreign_characters() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("abc;def").is_none());
        assert!(SessionId::parse("abc def").is_none());
        assert!(SessionId::parse(&"a".repeat(129)).is_none());
        assert!(SessionId::parse("AbC-123_x").is_some());
    }

    #[test]
    fn store_key_uses_prefix() {
        let id = SessionId::parse("token").map(|id| id.store_key());
        assert_eq!(id.as_deref(), Some("sess:token"));
    }

    #[test]
    fn debug_does_not_print_full_token() {
        let id = SessionId::generate();
        let printed = format!("{id:?}");
        assert!(!printed.contains(id.as_str()));
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let user_id = Uuid::new_v4();
        let record = SessionRecord::new(user_id, Some(json!({"name": "Ada"})));
        let value = serde_json::to_value(&record).ok();
        assert_eq!(
            value,
            Some(json!({"userId": user_id.to_string(), "data": {"name": "Ada"}}))
        );

        let bare = SessionRecord::new(user_id, None);
        let value = serde_json::to_value(&bare).ok();
        assert_eq!(value, Some(json!({"userId": user_id.to_string()})));
    }
}

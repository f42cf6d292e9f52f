//! Session lifecycle on top of a [`SessionStore`]: creation, resolution,
//! destruction, TTL policy and store timeouts.

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{Session, SessionCookie, SessionId, SessionRecord, SessionStore, StoreError};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_STORE_TIMEOUT_MILLIS: u64 = 2_000;

/// Whether reading a session pushes its expiry forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// TTL runs from creation; reads never extend it.
    #[default]
    Fixed,
    /// Every successful read resets the TTL.
    Sliding,
}

impl FromStr for ExpirationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "sliding" => Ok(Self::Sliding),
            other => Err(format!("invalid expiration policy: {other}")),
        }
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Sliding => f.write_str("sliding"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    ttl: Duration,
    expiration: ExpirationPolicy,
    store_timeout: Duration,
    secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            expiration: ExpirationPolicy::Fixed,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MILLIS),
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Mark issued cookies `Secure`; enabled in production mode.
    #[must_use]
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn expiration(&self) -> ExpirationPolicy {
        self.expiration
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    #[must_use]
    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie
    }
}

/// Explicitly constructed session handle shared by the context builder and
/// the procedures that sign users in and out.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    cookie: SessionCookie,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        let cookie = SessionCookie::new(config.ttl(), config.secure_cookie());
        Self {
            store,
            config,
            cookie,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    /// Start a session for `user_id` under a freshly generated id.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the store rejects or does not answer the write.
    pub async fn create(&self, user_id: Uuid, data: Option<Value>) -> Result<Session, StoreError> {
        let id = SessionId::generate();
        let record = SessionRecord::new(user_id, data);
        self.bounded(self.store.put(&id, &record, self.config.ttl()))
            .await?;
        debug!(session = ?id, %user_id, "session created");
        Ok(Session::new(id, record))
    }

    /// Look up a session; `Ok(None)` covers both unknown and expired ids.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the store is unreachable or too slow.
    pub async fn resolve(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let Some(record) = self.bounded(self.store.get(id)).await? else {
            return Ok(None);
        };
        if self.config.expiration() == ExpirationPolicy::Sliding {
            self.bounded(self.store.touch(id, self.config.ttl()))
                .await?;
        }
        Ok(Some(Session::new(id.clone(), record)))
    }

    /// Remove a session. Removing an unknown id succeeds.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the store is unreachable or too slow.
    pub async fn destroy(&self, id: &SessionId) -> Result<(), StoreError> {
        self.bounded(self.store.delete(id)).await?;
        debug!(session = ?id, "session destroyed");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.store_timeout();
        tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| StoreError::Timeout(limit))?
    }
}

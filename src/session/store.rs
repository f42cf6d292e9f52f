//! Session store contract.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::{SessionId, SessionRecord};

/// Failures talking to the backing store.
///
/// None of these mean "no session": callers must surface them as internal
/// errors instead of treating the request as anonymous.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store backend error: {0}")]
    Backend(sqlx::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("invalid session payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Connection-level failures are `Unavailable`; query failures stay `Backend`.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(err.to_string()),
            err => Self::Backend(err),
        }
    }
}

/// TTL-bearing key-value mapping from session id to session record.
///
/// Every operation is a single-key atomic operation; there are no multi-key
/// transactions and no optimistic concurrency.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `record` under `id`, unconditionally overwriting any existing entry.
    async fn put(
        &self,
        id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Return the record if present and unexpired.
    ///
    /// Expired and unknown ids are indistinguishable.
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove the entry. Deleting a missing id is not an error.
    async fn delete(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Reset the TTL of a live entry without rewriting it. No-op for missing ids.
    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), StoreError>;
}

//! Postgres-backed session store.
//!
//! Expiry is enforced by the read query (`expires_at > now()`), so an expired
//! row is never returned even before it is overwritten or deleted. Every write
//! also deletes the expired rows of other sessions.

use async_trait::async_trait;
use sqlx::{PgPool, Row, types::Json};
use std::time::Duration;
use tracing::Instrument;

use super::{SessionId, SessionRecord, SessionStore, StoreError};

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(
        &self,
        id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        // The purge skips $1: the upsert must not hit a row deleted by the same statement.
        let query = r"
            WITH purged AS (
                DELETE FROM rpc_sessions
                WHERE expires_at <= now() AND key <> $1
            )
            INSERT INTO rpc_sessions (key, value, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    expires_at = EXCLUDED.expires_at
        ";
        sqlx::query(query)
            .bind(id.store_key())
            .bind(Json(record))
            .bind(ttl.as_secs_f64())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let query = "SELECT value FROM rpc_sessions WHERE key = $1 AND expires_at > now()";
        let row = sqlx::query(query)
            .bind(id.store_key())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        match row {
            Some(row) => {
                let Json(record) = row.try_get::<Json<SessionRecord>, _>("value")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        let query = "DELETE FROM rpc_sessions WHERE key = $1";
        sqlx::query(query)
            .bind(id.store_key())
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }

    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), StoreError> {
        let query = r"
            UPDATE rpc_sessions
               SET expires_at = now() + make_interval(secs => $2)
             WHERE key = $1 AND expires_at > now()
        ";
        sqlx::query(query)
            .bind(id.store_key())
            .bind(ttl.as_secs_f64())
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(())
    }
}

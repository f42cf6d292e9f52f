//! Process-local session store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{SessionId, SessionRecord, SessionStore, StoreError};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory store keyed by `sess:<id>`, values kept as serialized JSON.
///
/// Expired entries are dropped when they are read, and every write sweeps the
/// whole map.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        id: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_string(record)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            id.store_key(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let key = id.store_key();
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };
        if !entry.is_live(Instant::now()) {
            entries.remove(&key);
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&entry.value)?))
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        self.entries.lock().await.remove(&id.store_key());
        Ok(())
    }

    async fn touch(&self, id: &SessionId, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(&id.store_key()) {
            if entry.is_live(now) {
                entry.expires_at = now + ttl;
            }
        }
        Ok(())
    }
}

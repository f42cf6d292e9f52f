//! User directory collaborator: lookup by email or id, and insertion.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::rpc::RpcError;

#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Fields needed to create a user; the email must already be normalized.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user with this email already exists")]
    Conflict,
    #[error("user directory backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl From<DirectoryError> for RpcError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict => RpcError::conflict("Email already exists"),
            DirectoryError::Backend(_) => RpcError::Internal(err.into()),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DirectoryError>;

    /// Insert a user; a duplicate email yields [`DirectoryError::Conflict`].
    async fn insert(&self, user: NewUser) -> Result<UserRecord, DirectoryError>;
}

/// Process-local directory, used for tests and local development.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, id: Uuid) {
        self.users.lock().await.remove(&id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(DirectoryError::Conflict);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }
}

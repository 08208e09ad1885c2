use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// User record as persisted by the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields required to create a user. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

/// Store failures. `Conflict` is the email uniqueness violation; everything
/// else collapses to an opaque `Storage` cause so callers branch on kind,
/// never on backend error text.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already exists")]
    Conflict,
    #[error("storage error")]
    Storage(#[source] anyhow::Error),
}

/// Credential store seam. The Postgres implementation backs the service; the
/// in-memory one substitutes for it in tests.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user. Surfaces `StoreError::Conflict` when the email is taken;
    /// the uniqueness constraint here is the arbiter under concurrent
    /// registration, not any check made above the store.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Apply a partial update and refresh `updated_at`. An empty patch is a
    /// plain fetch: no write happens and `updated_at` stays as it was.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;

    /// Returns true iff a record existed and was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

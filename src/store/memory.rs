//! In-memory credential store used to substitute for Postgres in tests.
//! Email uniqueness is enforced under a single lock, so check-and-insert is
//! atomic and the concurrent-registration invariant holds here too.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{NewUser, StoreError, User, UserPatch, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(current) = users.get(&id).cloned() else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(current));
        }
        if let Some(email) = &patch.email {
            if *email != current.email {
                // same uniqueness rule as the real store
                let taken = users.values().any(|u| u.id != id && u.email == *email);
                if taken {
                    return Err(StoreError::Conflict);
                }
            }
        }
        let user = users.get_mut(&id).unwrap();
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "alice".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create(new_user("a@x.com")).await.expect("first create");
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_patch_is_a_fetch() {
        let store = MemoryStore::new();
        let created = store.create(new_user("a@x.com")).await.unwrap();
        let fetched = store
            .update(created.id, UserPatch::default())
            .await
            .unwrap()
            .expect("record exists");
        assert_eq!(fetched.username, created.username);
        assert_eq!(fetched.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_and_keeps_other_fields() {
        let store = MemoryStore::new();
        let created = store.create(new_user("a@x.com")).await.unwrap();
        let patch = UserPatch {
            username: Some("alice2".into()),
            ..Default::default()
        };
        let updated = store.update(created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.email, created.email);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn delete_is_true_once_then_false() {
        let store = MemoryStore::new();
        let created = store.create(new_user("a@x.com")).await.unwrap();
        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.find_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_user_is_absent_not_error() {
        let store = MemoryStore::new();
        let result = store.update(Uuid::new_v4(), UserPatch::default()).await.unwrap();
        assert!(result.is_none());
    }
}

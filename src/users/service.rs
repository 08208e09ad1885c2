use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AccountError;
use crate::events::{EventPublisher, LifecycleEvent};
use crate::store::{NewUser, User, UserPatch, UserStore};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const MIN_PASSWORD_LEN: usize = 8;

/// A successful login: the bearer token plus the authenticated user.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Orchestrates registration, authentication and the credential lifecycle
/// over an injected store and publisher. Each call is a short transaction;
/// the store write is the atomic boundary and event publishes happen off the
/// request path.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    publisher: Arc<dyn EventPublisher>,
    jwt: JwtKeys,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        publisher: Arc<dyn EventPublisher>,
        jwt: JwtKeys,
    ) -> Self {
        Self {
            store,
            publisher,
            jwt,
        }
    }

    /// Fire-and-forget event publish. Failure is logged and dropped; the
    /// triggering operation has already committed and its outcome stands.
    fn emit(&self, event: LifecycleEvent) {
        let publisher = self.publisher.clone();
        let kind = event.kind;
        let user_id = event.user_id;
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(event).await {
                warn!(error = %e, ?kind, %user_id, "lifecycle event publish failed");
            }
        });
    }

    async fn hash_on_blocking(&self, plain: String) -> Result<String, AccountError> {
        tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .map_err(|e| AccountError::Storage(e.into()))?
            .map_err(AccountError::Storage)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        let username = username.trim().to_string();
        let email = email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AccountError::Validation("username is required".into()));
        }
        if !is_valid_email(&email) {
            return Err(AccountError::Validation("invalid email".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AccountError::Validation("password too short".into()));
        }

        // Fast path only: the store's uniqueness constraint is the arbiter
        // under concurrent registration, not this check.
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict);
        }

        let password_hash = self.hash_on_blocking(password.to_string()).await?;
        let user = self
            .store
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.emit(LifecycleEvent::created(&user));
        Ok(user)
    }

    /// Authenticate and issue a token. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = email.trim().to_lowercase();

        let user = match self.store.find_by_email(&email).await? {
            Some(u) => u,
            None => return Err(AccountError::Unauthorized),
        };

        let plain = password.to_string();
        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .map_err(|e| AccountError::Storage(e.into()))?;
        if !ok {
            return Err(AccountError::Unauthorized);
        }

        let token = self.jwt.issue(user.id).map_err(AccountError::Storage)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Session { token, user })
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<User, AccountError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list().await?)
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<User, AccountError> {
        let email = match email {
            Some(e) => {
                let e = e.trim().to_lowercase();
                if !is_valid_email(&e) {
                    return Err(AccountError::Validation("invalid email".into()));
                }
                Some(e)
            }
            None => None,
        };
        let patch = UserPatch {
            username,
            email,
            password_hash: None,
        };
        let user = self
            .store
            .update(id, patch)
            .await?
            .ok_or(AccountError::NotFound)?;

        self.emit(LifecycleEvent::updated(&user));
        Ok(user)
    }

    pub async fn change_password(
        &self,
        subject: Uuid,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AccountError::Validation("password too short".into()));
        }
        let password_hash = self.hash_on_blocking(new_password.to_string()).await?;
        let user = self
            .store
            .update(
                subject,
                UserPatch {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AccountError::NotFound)?;

        info!(user_id = %user.id, "password changed");
        self.emit(LifecycleEvent::updated(&user));
        Ok(())
    }

    /// Delete an account. The record is snapshotted first so the Deleted
    /// event can carry username and email after the row is gone.
    pub async fn delete_account(&self, subject: Uuid) -> Result<(), AccountError> {
        let snapshot = self
            .store
            .find_by_id(subject)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self.store.delete(subject).await? {
            return Err(AccountError::NotFound);
        }

        info!(user_id = %snapshot.id, "user deleted");
        self.emit(LifecycleEvent::deleted(&snapshot));
        Ok(())
    }
}

use axum::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::User;

pub mod amqp;

/// Kind of user lifecycle transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    #[serde(rename = "user.created")]
    Created,
    #[serde(rename = "user.updated")]
    Updated,
    #[serde(rename = "user.deleted")]
    Deleted,
}

/// Immutable fact about a user record transition, published for downstream
/// consumers. Ownership moves to the publisher on send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    #[serde(rename = "eventType")]
    pub kind: EventKind,
    pub user_id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LifecycleEvent {
    fn snapshot(kind: EventKind, user: &User) -> Self {
        Self {
            kind,
            user_id: user.id,
            username: user.username.clone(),
            email: Some(user.email.clone()),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(user: &User) -> Self {
        Self::snapshot(EventKind::Created, user)
    }

    pub fn updated(user: &User) -> Self {
        Self::snapshot(EventKind::Updated, user)
    }

    /// Built from a snapshot taken before the delete; the record no longer
    /// exists in the store by the time this is published.
    pub fn deleted(user: &User) -> Self {
        Self::snapshot(EventKind::Deleted, user)
    }
}

/// Outbound publish contract. Delivery is best-effort: the account service
/// spawns publishes off the request path and only logs failures.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: LifecycleEvent) -> anyhow::Result<()>;

    /// Tear down any live bus connection. Called once on process shutdown.
    async fn close(&self) {}
}

//! crates/freshness_core/src/domain.rs
//!
//! Defines the pure, core data structures for the expiry engine.
//! These structs are independent of any database or serialization format.
//! Relationships are plain foreign-key ids; lookups go through the ports.

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// A catalog entry shared by many tracked items (e.g. "Milk").
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    /// Days the product stays edible once opened. `None` means "use the
    /// engine fallback".
    pub default_opened_rule: Option<i32>,
}

/// A push-provider device registration owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceToken {
    pub token: String,
    pub label: Option<String>,
}

impl DeviceToken {
    pub fn new(token: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            token: token.into(),
            label: label.map(str::to_string),
        }
    }
}

/// A user who can receive notifications, with every device they registered.
#[derive(Debug, Clone)]
pub struct RecipientUser {
    pub user_id: Uuid,
    pub devices: Vec<DeviceToken>,
    pub household_id: Option<Uuid>,
}

/// A perishable instance owned by a user.
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub id: Uuid,
    pub owner: RecipientUser,
    pub catalog: CatalogItem,
    pub expiration_date: NaiveDate,
    pub opened_date: Option<NaiveDate>,
    /// Per-item override of the catalog's opened rule.
    pub opened_rule: Option<i32>,
    /// Idempotency marker written by the sweep.
    pub last_notified_at: Option<NaiveDateTime>,
}

impl TrackedItem {
    pub fn display_name(&self) -> &str {
        &self.catalog.name
    }
}

/// A candidate row that could not be turned into a [`TrackedItem`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed candidate {item_id:?}: {reason}")]
pub struct MalformedCandidate {
    pub item_id: Option<Uuid>,
    pub reason: String,
}

/// One row returned by the candidate query.
pub type Candidate = Result<TrackedItem, MalformedCandidate>;

/// The payload of a notification before the store assigns it an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub related_item_id: Option<Uuid>,
}

/// A persisted, in-app notification history entry.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub is_read: bool,
    pub related_item_id: Option<Uuid>,
}

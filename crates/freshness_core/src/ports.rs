//! crates/freshness_core/src/ports.rs
//!
//! Defines the service contracts (traits) the expiry engine consumes.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! engine independent of the database, the push provider and the system clock.

use crate::domain::{Candidate, NewNotification, NotificationRecord, RecipientUser};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Why a single push delivery did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The provider answered but refused the message (bad token, quota, ...).
    #[error("rejected by push provider ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The provider could not be reached.
    #[error("push transport failure: {0}")]
    Transport(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Items whose hard expiration is on or before `lookahead`, plus every item
    /// with an opened date, each with its owner's devices populated.
    async fn find_due_candidates(&self, lookahead: NaiveDate) -> PortResult<Vec<Candidate>>;
}

#[async_trait]
pub trait ItemLedgerStore: Send + Sync {
    /// Advances the item's `last_notified_at` marker.
    async fn save_last_notified(&self, item_id: Uuid, at: NaiveDateTime) -> PortResult<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists a notification and returns it with its assigned identity.
    async fn save(&self, notification: NewNotification) -> PortResult<NotificationRecord>;
}

#[async_trait]
pub trait HouseholdDirectory: Send + Sync {
    /// Every member of the household, with their devices.
    async fn household_members(&self, household_id: Uuid) -> PortResult<Vec<RecipientUser>>;
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Sends one message to one device token. Ordinary delivery failures are
    /// returned, never raised.
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The real clock, reading local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

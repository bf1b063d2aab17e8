//! crates/freshness_core/src/recorder.rs
//!
//! Writes the in-app notification history entry for a dispatch decision.
//! The record reflects "we decided to notify", so it is written before any
//! push attempt and regardless of how delivery turns out.

use crate::domain::{NewNotification, NotificationRecord};
use crate::ports::{Clock, NotificationStore, PortResult};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationRecorder {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl NotificationRecorder {
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persists one notification for `recipient_id`. Store failures are
    /// returned to the caller untouched.
    pub async fn record(
        &self,
        recipient_id: Uuid,
        title: &str,
        body: &str,
        related_item_id: Option<Uuid>,
    ) -> PortResult<NotificationRecord> {
        let notification = NewNotification {
            recipient_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: self.clock.now(),
            related_item_id,
        };
        let record = self.store.save(notification).await?;
        debug!(notification_id = %record.id, %recipient_id, "Notification recorded");
        Ok(record)
    }
}

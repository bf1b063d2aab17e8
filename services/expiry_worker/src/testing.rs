//! Port fakes for the service-level tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use freshness_core::domain::{
    Candidate, CatalogItem, NewNotification, NotificationRecord, RecipientUser, TrackedItem,
};
use freshness_core::ports::{
    CandidateSource, Clock, HouseholdDirectory, ItemLedgerStore, NotificationStore, PortError,
    PortResult, PushTransport,
};
use freshness_core::{EngineSettings, ExpirySweepJob, SweepDeps};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A time on 2024-03-10.
pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 10)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Default)]
pub struct FakeStore {
    items: Mutex<Vec<TrackedItem>>,
    notifications: Mutex<Vec<NotificationRecord>>,
    queries: AtomicUsize,
    fail_query: AtomicBool,
}

impl FakeStore {
    pub fn add_expiring_today(&self, name: &str) {
        self.items.lock().unwrap().push(TrackedItem {
            id: Uuid::new_v4(),
            owner: RecipientUser {
                user_id: Uuid::new_v4(),
                devices: Vec::new(),
                household_id: None,
            },
            catalog: CatalogItem {
                id: Uuid::new_v4(),
                name: name.to_string(),
                default_opened_rule: None,
            },
            expiration_date: at(0, 0).date(),
            opened_date: None,
            opened_rule: None,
            last_notified_at: None,
        });
    }

    pub fn fail_queries(&self) {
        self.fail_query.store(true, Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl CandidateSource for FakeStore {
    async fn find_due_candidates(&self, _lookahead: NaiveDate) -> PortResult<Vec<Candidate>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        Ok(self.items.lock().unwrap().iter().cloned().map(Ok).collect())
    }
}

#[async_trait]
impl ItemLedgerStore for FakeStore {
    async fn save_last_notified(&self, item_id: Uuid, at: NaiveDateTime) -> PortResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| PortError::NotFound(item_id.to_string()))?;
        item.last_notified_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for FakeStore {
    async fn save(&self, n: NewNotification) -> PortResult<NotificationRecord> {
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            recipient_id: n.recipient_id,
            title: n.title,
            body: n.body,
            created_at: n.created_at,
            is_read: false,
            related_item_id: n.related_item_id,
        };
        self.notifications.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HouseholdDirectory for FakeStore {
    async fn household_members(&self, _household_id: Uuid) -> PortResult<Vec<RecipientUser>> {
        Ok(Vec::new())
    }
}

/// A sweep job wired entirely to `store`, with the clock at 09:00.
pub fn job(store: Arc<FakeStore>, transport: Option<Arc<dyn PushTransport>>) -> ExpirySweepJob {
    let deps = SweepDeps {
        candidates: store.clone(),
        ledger: store.clone(),
        notifications: store.clone(),
        households: store,
        transport,
        clock: Arc::new(FixedClock(at(9, 0))),
    };
    ExpirySweepJob::new(deps, EngineSettings::default())
}

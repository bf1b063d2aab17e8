//! In-memory fakes of every port, shared by the unit tests.

use crate::domain::{
    Candidate, CatalogItem, DeviceToken, MalformedCandidate, NewNotification, NotificationRecord,
    RecipientUser, TrackedItem,
};
use crate::ports::{
    CandidateSource, Clock, DeliveryError, HouseholdDirectory, ItemLedgerStore,
    NotificationStore, PortError, PortResult, PushTransport,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use uuid::Uuid;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn item(name: &str, expiration_date: NaiveDate, tokens: &[&str]) -> TrackedItem {
    TrackedItem {
        id: Uuid::new_v4(),
        owner: RecipientUser {
            user_id: Uuid::new_v4(),
            devices: tokens.iter().map(|t| DeviceToken::new(*t, Some("phone"))).collect(),
            household_id: None,
        },
        catalog: CatalogItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            default_opened_rule: None,
        },
        expiration_date,
        opened_date: None,
        opened_rule: None,
        last_notified_at: None,
    }
}

//=========================================================================================
// Clock
//=========================================================================================

pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::minutes(minutes);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

//=========================================================================================
// Store
//=========================================================================================

#[derive(Default)]
struct StoreState {
    candidates: Vec<Candidate>,
    notifications: Vec<NotificationRecord>,
    households: HashMap<Uuid, Vec<RecipientUser>>,
    last_lookahead: Option<NaiveDate>,
    fail_candidate_query: bool,
    fail_all_saves: bool,
    fail_saves_for: HashSet<Uuid>,
    fail_ledger_for: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn add_item(&self, item: TrackedItem) {
        self.state.lock().unwrap().candidates.push(Ok(item));
    }

    pub fn add_malformed(&self, malformed: MalformedCandidate) {
        self.state.lock().unwrap().candidates.push(Err(malformed));
    }

    pub fn set_household(&self, household_id: Uuid, members: Vec<RecipientUser>) {
        self.state
            .lock()
            .unwrap()
            .households
            .insert(household_id, members);
    }

    pub fn fail_candidate_query(&self) {
        self.state.lock().unwrap().fail_candidate_query = true;
    }

    pub fn fail_notification_saves(&self) {
        self.state.lock().unwrap().fail_all_saves = true;
    }

    pub fn fail_notification_saves_for(&self, item_id: Uuid) {
        self.state.lock().unwrap().fail_saves_for.insert(item_id);
    }

    pub fn fail_ledger_for(&self, item_id: Uuid) {
        self.state.lock().unwrap().fail_ledger_for.insert(item_id);
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.state.lock().unwrap().notifications.clone()
    }

    pub fn last_lookahead(&self) -> Option<NaiveDate> {
        self.state.lock().unwrap().last_lookahead
    }

    pub fn last_notified(&self, item_id: Uuid) -> Option<NaiveDateTime> {
        self.state
            .lock()
            .unwrap()
            .candidates
            .iter()
            .flatten()
            .find(|i| i.id == item_id)
            .and_then(|i| i.last_notified_at)
    }
}

#[async_trait]
impl CandidateSource for InMemoryStore {
    async fn find_due_candidates(&self, lookahead: NaiveDate) -> PortResult<Vec<Candidate>> {
        let mut state = self.state.lock().unwrap();
        state.last_lookahead = Some(lookahead);
        if state.fail_candidate_query {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        Ok(state
            .candidates
            .iter()
            .filter(|c| match c {
                Ok(item) => item.expiration_date <= lookahead || item.opened_date.is_some(),
                Err(_) => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ItemLedgerStore for InMemoryStore {
    async fn save_last_notified(&self, item_id: Uuid, at: NaiveDateTime) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_ledger_for.contains(&item_id) {
            return Err(PortError::Unexpected("ledger write failed".to_string()));
        }
        let item = state
            .candidates
            .iter_mut()
            .flatten()
            .find(|i| i.id == item_id)
            .ok_or_else(|| PortError::NotFound(format!("Item {item_id} not found")))?;
        item.last_notified_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn save(&self, notification: NewNotification) -> PortResult<NotificationRecord> {
        let mut state = self.state.lock().unwrap();
        let blocked = notification
            .related_item_id
            .is_some_and(|id| state.fail_saves_for.contains(&id));
        if state.fail_all_saves || blocked {
            return Err(PortError::Unexpected("notification insert failed".to_string()));
        }
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            title: notification.title,
            body: notification.body,
            created_at: notification.created_at,
            is_read: false,
            related_item_id: notification.related_item_id,
        };
        state.notifications.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HouseholdDirectory for InMemoryStore {
    async fn household_members(&self, household_id: Uuid) -> PortResult<Vec<RecipientUser>> {
        self.state
            .lock()
            .unwrap()
            .households
            .get(&household_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Household {household_id} not found")))
    }
}

//=========================================================================================
// Push transport
//=========================================================================================

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn fail_token(&self, token: &str) {
        self.failing.lock().unwrap().insert(token.to_string());
    }

    pub fn stall_token(&self, token: &str) {
        self.stalled.lock().unwrap().insert(token.to_string());
    }

    /// Every token a send was attempted for, in call order.
    pub fn sent_tokens(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, token: &str, _title: &str, _body: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(token.to_string());
        let stalled = self.stalled.lock().unwrap().contains(token);
        if stalled {
            tokio::time::sleep(StdDuration::from_secs(30)).await;
        }
        if self.failing.lock().unwrap().contains(token) {
            return Err(DeliveryError::Rejected {
                status: 404,
                message: "UNREGISTERED".to_string(),
            });
        }
        Ok(())
    }
}

/// Holds every send open for a fixed delay and tracks how many overlap.
pub struct GaugeTransport {
    hold: StdDuration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeTransport {
    pub fn new(hold: StdDuration) -> Self {
        Self {
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushTransport for GaugeTransport {
    async fn send(&self, _token: &str, _title: &str, _body: &str) -> Result<(), DeliveryError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

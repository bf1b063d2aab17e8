//! crates/freshness_core/src/sweep.rs
//!
//! The expiry sweep: one stateless pass over the due candidates.
//!
//! Per candidate: ledger gate, opened-rule resolution, effective expiry,
//! classification, then record, fan out and advance the ledger. A failure
//! while processing one candidate is logged and the sweep moves on; only a
//! failed candidate query ends the run early.

use crate::dispatch::{FanoutReport, PushFanoutDispatcher};
use crate::domain::{DeviceToken, RecipientUser, TrackedItem};
use crate::expiry::{effective_expiry, resolve_opened_rule};
use crate::ledger::should_notify;
use crate::policy::{ReminderKind, ReminderPolicy};
use crate::ports::{
    CandidateSource, Clock, HouseholdDirectory, ItemLedgerStore, NotificationStore, PortError,
    PushTransport,
};
use crate::recorder::NotificationRecorder;
use crate::settings::{EngineSettings, FanoutScope};
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

//=========================================================================================
// Errors
//=========================================================================================

/// An error that ends a whole sweep run.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Candidate query failed: {0}")]
    CandidateQuery(#[source] PortError),
}

/// An error fatal to one candidate only.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Could not resolve household recipients: {0}")]
    Recipients(#[source] PortError),
    #[error("Could not record notification: {0}")]
    Record(#[source] PortError),
    #[error("Could not advance notification ledger: {0}")]
    Ledger(#[source] PortError),
}

//=========================================================================================
// Outcomes and Reports
//=========================================================================================

/// What happened to a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    AlreadyNotified,
    NotDue { days_until: i64 },
    Notified {
        kind: ReminderKind,
        days_until: i64,
        records_written: usize,
        fanout: FanoutReport,
    },
}

/// Summary of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub candidates: usize,
    pub notified: usize,
    pub already_notified: usize,
    pub not_due: usize,
    pub malformed: usize,
    pub failed: usize,
    pub records_written: usize,
    pub push_delivered: usize,
    pub push_failed: usize,
    pub push_timed_out: usize,
    pub push_skipped: usize,
}

impl SweepReport {
    fn tally(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::AlreadyNotified => self.already_notified += 1,
            ItemOutcome::NotDue { .. } => self.not_due += 1,
            ItemOutcome::Notified {
                records_written,
                fanout,
                ..
            } => {
                self.notified += 1;
                self.records_written += records_written;
                self.push_delivered += fanout.delivered();
                self.push_failed += fanout.failed();
                self.push_timed_out += fanout.timed_out();
                self.push_skipped += fanout.skipped();
            }
        }
    }
}

//=========================================================================================
// The Job
//=========================================================================================

/// Every collaborator the sweep needs, injected by the caller.
#[derive(Clone)]
pub struct SweepDeps {
    pub candidates: Arc<dyn CandidateSource>,
    pub ledger: Arc<dyn ItemLedgerStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub households: Arc<dyn HouseholdDirectory>,
    /// `None` runs the dispatcher in offline-notification mode.
    pub transport: Option<Arc<dyn PushTransport>>,
    pub clock: Arc<dyn Clock>,
}

pub struct ExpirySweepJob {
    candidates: Arc<dyn CandidateSource>,
    ledger: Arc<dyn ItemLedgerStore>,
    households: Arc<dyn HouseholdDirectory>,
    clock: Arc<dyn Clock>,
    recorder: NotificationRecorder,
    dispatcher: PushFanoutDispatcher,
    policy: ReminderPolicy,
    settings: EngineSettings,
}

impl ExpirySweepJob {
    pub fn new(deps: SweepDeps, settings: EngineSettings) -> Self {
        let recorder = NotificationRecorder::new(deps.notifications, deps.clock.clone());
        let dispatcher = PushFanoutDispatcher::new(
            deps.transport,
            settings.push_timeout,
            settings.push_concurrency,
        );
        let policy = ReminderPolicy::new(settings.reminder_lead_days.iter().copied());
        Self {
            candidates: deps.candidates,
            ledger: deps.ledger,
            households: deps.households,
            clock: deps.clock,
            recorder,
            dispatcher,
            policy,
            settings,
        }
    }

    pub fn push_online(&self) -> bool {
        self.dispatcher.is_online()
    }

    /// Runs one sweep over every due candidate.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        let started_at = self.clock.now();
        let today = started_at.date();
        let lookahead = today
            .checked_add_days(Days::new(u64::from(self.settings.lookahead_days)))
            .unwrap_or(NaiveDate::MAX);
        info!(%today, %lookahead, "Running expiry sweep...");

        let candidates = self
            .candidates
            .find_due_candidates(lookahead)
            .await
            .map_err(SweepError::CandidateQuery)?;

        let mut report = SweepReport {
            started_at,
            candidates: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            let item = match candidate {
                Ok(item) => item,
                Err(malformed) => {
                    warn!(error = %malformed, "Skipping malformed expiry candidate");
                    report.malformed += 1;
                    continue;
                }
            };

            match self.process_item(&item, today).await {
                Ok(outcome) => report.tally(&outcome),
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "Failed to process expiry candidate");
                    report.failed += 1;
                }
            }
        }

        report.finished_at = self.clock.now();
        info!(
            candidates = report.candidates,
            notified = report.notified,
            already_notified = report.already_notified,
            failed = report.failed,
            malformed = report.malformed,
            push_delivered = report.push_delivered,
            push_failed = report.push_failed,
            "Expiry sweep finished."
        );
        Ok(report)
    }

    /// Evaluates one item and, when a reminder is due, records, fans out and
    /// advances the ledger.
    pub async fn process_item(
        &self,
        item: &TrackedItem,
        today: NaiveDate,
    ) -> Result<ItemOutcome, ItemError> {
        if !should_notify(item.last_notified_at, today) {
            debug!(item_id = %item.id, "Already notified today");
            return Ok(ItemOutcome::AlreadyNotified);
        }

        let opened_rule = resolve_opened_rule(
            item.opened_rule,
            item.catalog.default_opened_rule,
            self.settings.default_opened_rule,
        );
        let expiry = effective_expiry(item.expiration_date, item.opened_date, opened_rule);
        let classification = self.policy.classify(today, expiry);

        let Some(body) = classification.message(item.display_name()) else {
            return Ok(ItemOutcome::NotDue {
                days_until: classification.days_until,
            });
        };
        let title = self.settings.notification_title.as_str();

        let recipients = self.resolve_recipients(&item.owner).await?;

        for recipient in &recipients {
            self.recorder
                .record(recipient.user_id, title, &body, Some(item.id))
                .await
                .map_err(ItemError::Record)?;
        }

        let devices: Vec<DeviceToken> = recipients
            .iter()
            .flat_map(|r| r.devices.iter().cloned())
            .collect();
        let fanout = self.dispatcher.dispatch(&devices, title, &body).await;

        // Advanced even when there were no devices to deliver to.
        self.ledger
            .save_last_notified(item.id, self.clock.now())
            .await
            .map_err(ItemError::Ledger)?;

        info!(
            item_id = %item.id,
            kind = ?classification.kind,
            days_until = classification.days_until,
            recipients = recipients.len(),
            devices = devices.len(),
            "Expiry notification dispatched"
        );

        Ok(ItemOutcome::Notified {
            kind: classification.kind,
            days_until: classification.days_until,
            records_written: recipients.len(),
            fanout,
        })
    }

    async fn resolve_recipients(
        &self,
        owner: &RecipientUser,
    ) -> Result<Vec<RecipientUser>, ItemError> {
        let household_id = match (self.settings.fanout_scope, owner.household_id) {
            (FanoutScope::Household, Some(id)) => id,
            _ => return Ok(vec![owner.clone()]),
        };

        let mut members = self
            .households
            .household_members(household_id)
            .await
            .map_err(ItemError::Recipients)?;
        if !members.iter().any(|m| m.user_id == owner.user_id) {
            members.insert(0, owner.clone());
        }
        Ok(dedup_members(members))
    }
}

fn dedup_members(members: Vec<RecipientUser>) -> Vec<RecipientUser> {
    let mut seen: Vec<Uuid> = Vec::with_capacity(members.len());
    members
        .into_iter()
        .filter(|m| {
            if seen.contains(&m.user_id) {
                false
            } else {
                seen.push(m.user_id);
                true
            }
        })
        .collect()
}

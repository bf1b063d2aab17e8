//! crates/freshness_core/src/policy.rs
//!
//! Classifies an item into an urgency bucket from today's date and its
//! effective expiry, and renders the reminder text.

use chrono::NaiveDate;

/// Lead times, in days before expiry, at which a reminder is sent.
pub const DEFAULT_REMINDER_LEAD_DAYS: [u32; 3] = [7, 3, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Expired,
    ExpiresToday,
    Reminder,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ReminderKind,
    /// Effective expiry minus today. Negative once expired.
    pub days_until: i64,
}

impl Classification {
    pub fn is_due(&self) -> bool {
        self.kind != ReminderKind::None
    }

    /// The user-facing text for this classification, or `None` when nothing
    /// should be sent.
    pub fn message(&self, item_name: &str) -> Option<String> {
        match self.kind {
            ReminderKind::Expired => Some(format!("Your {item_name} has expired!")),
            ReminderKind::ExpiresToday => Some(format!("Your {item_name} expires today!")),
            ReminderKind::Reminder => Some(format!(
                "Reminder: your {item_name} expires in {} days!",
                self.days_until
            )),
            ReminderKind::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    lead_days: Vec<u32>,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REMINDER_LEAD_DAYS)
    }
}

impl ReminderPolicy {
    /// Builds a policy from the lead times; zero and duplicates are dropped,
    /// the rest kept in descending order.
    pub fn new(lead_days: impl IntoIterator<Item = u32>) -> Self {
        let mut lead_days: Vec<u32> = lead_days.into_iter().filter(|d| *d > 0).collect();
        lead_days.sort_unstable_by(|a, b| b.cmp(a));
        lead_days.dedup();
        Self { lead_days }
    }

    pub fn lead_days(&self) -> &[u32] {
        &self.lead_days
    }

    pub fn classify(&self, today: NaiveDate, effective_expiry: NaiveDate) -> Classification {
        let days_until = (effective_expiry - today).num_days();
        let kind = match days_until {
            d if d < 0 => ReminderKind::Expired,
            0 => ReminderKind::ExpiresToday,
            d if self.is_lead_day(d) => ReminderKind::Reminder,
            _ => ReminderKind::None,
        };
        Classification { kind, days_until }
    }

    fn is_lead_day(&self, days_until: i64) -> bool {
        u32::try_from(days_until)
            .map(|d| self.lead_days.contains(&d))
            .unwrap_or(false)
    }
}

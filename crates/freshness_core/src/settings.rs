//! crates/freshness_core/src/settings.rs
//!
//! Tunables of the expiry engine. The service crate fills these from its
//! environment configuration.

use crate::expiry::FALLBACK_OPENED_RULE;
use crate::policy::DEFAULT_REMINDER_LEAD_DAYS;
use std::str::FromStr;
use std::time::Duration;

/// Who receives the reminder for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutScope {
    /// Only the item owner's devices.
    #[default]
    Owner,
    /// Every member of the owner's household, when the owner has one.
    Household,
}

impl FromStr for FanoutScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "household" => Ok(Self::Household),
            other => Err(format!("'{other}' is not one of: owner, household")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub reminder_lead_days: Vec<u32>,
    pub default_opened_rule: u32,
    /// Hard expirations within this many days of today are candidates.
    pub lookahead_days: u32,
    pub notification_title: String,
    pub fanout_scope: FanoutScope,
    /// Upper bound for a single push call.
    pub push_timeout: Duration,
    /// Maximum in-flight push calls per item.
    pub push_concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reminder_lead_days: DEFAULT_REMINDER_LEAD_DAYS.to_vec(),
            default_opened_rule: FALLBACK_OPENED_RULE,
            lookahead_days: 7,
            notification_title: "Expiry Alert".to_string(),
            fanout_scope: FanoutScope::Owner,
            push_timeout: Duration::from_secs(10),
            push_concurrency: 8,
        }
    }
}

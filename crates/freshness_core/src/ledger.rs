//! crates/freshness_core/src/ledger.rs
//!
//! The `last_notified_at` gate: at most one notification per item per
//! calendar day, however often the sweep runs.

use chrono::{NaiveDate, NaiveDateTime};

/// True when the item has never been notified, or was last notified on an
/// earlier calendar day than `today`.
pub fn should_notify(last_notified_at: Option<NaiveDateTime>, today: NaiveDate) -> bool {
    match last_notified_at {
        None => true,
        Some(at) => at.date() < today,
    }
}

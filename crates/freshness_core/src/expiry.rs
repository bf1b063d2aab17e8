//! crates/freshness_core/src/expiry.rs
//!
//! Effective spoilage date: the earlier of the hard expiration date and the
//! opened-shelf-life deadline.

use chrono::{Days, NaiveDate};

/// Days an opened item stays edible when neither the item nor its catalog
/// entry says otherwise.
pub const FALLBACK_OPENED_RULE: u32 = 3;

/// Picks the opened rule for one item: item override, then catalog default,
/// then `fallback`. Non-positive values are ignored.
pub fn resolve_opened_rule(
    item_override: Option<i32>,
    catalog_default: Option<i32>,
    fallback: u32,
) -> u32 {
    [item_override, catalog_default]
        .into_iter()
        .flatten()
        .find_map(|days| u32::try_from(days).ok().filter(|d| *d > 0))
        .unwrap_or(fallback)
}

/// Computes the date an item should be considered spoiled.
pub fn effective_expiry(
    hard_expiration: NaiveDate,
    opened_date: Option<NaiveDate>,
    opened_rule: u32,
) -> NaiveDate {
    let Some(opened) = opened_date else {
        return hard_expiration;
    };
    // Past the end of the calendar the hard date is always the earlier one.
    match opened.checked_add_days(Days::new(u64::from(opened_rule))) {
        Some(opened_deadline) => opened_deadline.min(hard_expiration),
        None => hard_expiration,
    }
}

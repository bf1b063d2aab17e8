//! services/expiry_worker/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the persistence ports from the `freshness_core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use freshness_core::domain::{
    Candidate, CatalogItem, DeviceToken, MalformedCandidate, NewNotification, NotificationRecord,
    RecipientUser, TrackedItem,
};
use freshness_core::ports::{
    CandidateSource, HouseholdDirectory, ItemLedgerStore, NotificationStore, PortError, PortResult,
};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every persistence port of the sweep.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Loads the devices of every user in `user_ids`, grouped by user.
    async fn devices_by_user(
        &self,
        user_ids: &[Uuid],
    ) -> PortResult<HashMap<Uuid, Vec<DeviceToken>>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = sqlx::query_as::<_, DeviceRecord>(
            "SELECT user_id, token, device_name FROM device_tokens WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut grouped: HashMap<Uuid, Vec<DeviceToken>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.user_id)
                .or_default()
                .push(DeviceToken::new(record.token, record.device_name.as_deref()));
        }
        Ok(grouped)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DeviceRecord {
    user_id: Uuid,
    token: String,
    device_name: Option<String>,
}

/// One row of the candidate query. Columns are optional so that bad rows can
/// be reported instead of failing the whole query.
#[derive(FromRow, Debug, Clone)]
struct CandidateRecord {
    id: Uuid,
    user_id: Uuid,
    household_id: Option<Uuid>,
    expiration_date: Option<NaiveDate>,
    opened_date: Option<NaiveDate>,
    opened_rule: Option<i32>,
    last_notified_at: Option<NaiveDateTime>,
    catalog_item_id: Option<Uuid>,
    catalog_name: Option<String>,
    default_opened_rule: Option<i32>,
}

impl CandidateRecord {
    fn to_domain(self, devices: Vec<DeviceToken>) -> Candidate {
        let malformed = |reason: &str| MalformedCandidate {
            item_id: Some(self.id),
            reason: reason.to_string(),
        };
        let expiration_date = self
            .expiration_date
            .ok_or_else(|| malformed("missing expiration date"))?;
        let (catalog_id, name) = match (self.catalog_item_id, self.catalog_name.clone()) {
            (Some(id), Some(name)) if !name.trim().is_empty() => (id, name),
            _ => return Err(malformed("missing catalog item")),
        };

        Ok(TrackedItem {
            id: self.id,
            owner: RecipientUser {
                user_id: self.user_id,
                devices,
                household_id: self.household_id,
            },
            catalog: CatalogItem {
                id: catalog_id,
                name,
                default_opened_rule: self.default_opened_rule,
            },
            expiration_date,
            opened_date: self.opened_date,
            opened_rule: self.opened_rule,
            last_notified_at: self.last_notified_at,
        })
    }
}

#[derive(FromRow)]
struct MemberRecord {
    user_id: Uuid,
    household_id: Option<Uuid>,
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    created_at: NaiveDateTime,
    is_read: bool,
    related_item_id: Option<Uuid>,
}
impl NotificationRow {
    fn to_domain(self) -> NotificationRecord {
        NotificationRecord {
            id: self.id,
            recipient_id: self.user_id,
            title: self.title,
            body: self.message,
            created_at: self.created_at,
            is_read: self.is_read,
            related_item_id: self.related_item_id,
        }
    }
}

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

#[async_trait]
impl CandidateSource for DbAdapter {
    async fn find_due_candidates(&self, lookahead: NaiveDate) -> PortResult<Vec<Candidate>> {
        let records = sqlx::query_as::<_, CandidateRecord>(
            r#"
            SELECT ti.id, ti.user_id, u.household_id, ti.expiration_date, ti.opened_date,
                   ti.opened_rule, ti.last_notified_at,
                   ci.id AS catalog_item_id, ci.name AS catalog_name, ci.default_opened_rule
            FROM tracked_items ti
            JOIN users u ON u.user_id = ti.user_id
            LEFT JOIN catalog_items ci ON ci.id = ti.catalog_item_id
            WHERE ti.expiration_date <= $1 OR ti.opened_date IS NOT NULL
            ORDER BY ti.expiration_date ASC NULLS FIRST
            "#,
        )
        .bind(lookahead)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut owners: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
        owners.sort_unstable();
        owners.dedup();
        let devices = self.devices_by_user(&owners).await?;

        let candidates = records
            .into_iter()
            .map(|r| {
                let owner_devices = devices.get(&r.user_id).cloned().unwrap_or_default();
                r.to_domain(owner_devices)
            })
            .collect();
        Ok(candidates)
    }
}

#[async_trait]
impl ItemLedgerStore for DbAdapter {
    async fn save_last_notified(&self, item_id: Uuid, at: NaiveDateTime) -> PortResult<()> {
        // Never moves the marker backwards and never clears it.
        let result = sqlx::query(
            "UPDATE tracked_items SET last_notified_at = $1 \
             WHERE id = $2 AND (last_notified_at IS NULL OR last_notified_at < $1)",
        )
        .bind(at)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tracked_items WHERE id = $1)")
                    .bind(item_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unexpected)?;
            if !exists {
                return Err(PortError::NotFound(format!("Tracked item {} not found", item_id)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for DbAdapter {
    async fn save(&self, notification: NewNotification) -> PortResult<NotificationRecord> {
        let record = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications \
             (id, user_id, title, message, created_at, is_read, related_item_id) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) \
             RETURNING id, user_id, title, message, created_at, is_read, related_item_id",
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.created_at)
        .bind(notification.related_item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }
}

#[async_trait]
impl HouseholdDirectory for DbAdapter {
    async fn household_members(&self, household_id: Uuid) -> PortResult<Vec<RecipientUser>> {
        let members = sqlx::query_as::<_, MemberRecord>(
            "SELECT user_id, household_id FROM users \
             WHERE household_id = $1 ORDER BY created_at ASC",
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let mut devices = self.devices_by_user(&ids).await?;

        Ok(members
            .into_iter()
            .map(|m| RecipientUser {
                user_id: m.user_id,
                devices: devices.remove(&m.user_id).unwrap_or_default(),
                household_id: m.household_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CandidateRecord {
        CandidateRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            household_id: None,
            expiration_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            opened_date: None,
            opened_rule: Some(2),
            last_notified_at: None,
            catalog_item_id: Some(Uuid::new_v4()),
            catalog_name: Some("Milk".to_string()),
            default_opened_rule: Some(4),
        }
    }

    #[test]
    fn complete_row_becomes_tracked_item() {
        let row = record();
        let devices = vec![DeviceToken::new("tok", Some("iPhone"))];

        let item = row.clone().to_domain(devices.clone()).unwrap();

        assert_eq!(item.id, row.id);
        assert_eq!(item.owner.user_id, row.user_id);
        assert_eq!(item.owner.devices, devices);
        assert_eq!(item.display_name(), "Milk");
        assert_eq!(item.opened_rule, Some(2));
        assert_eq!(item.catalog.default_opened_rule, Some(4));
    }

    #[test]
    fn missing_expiration_is_malformed() {
        let mut row = record();
        row.expiration_date = None;
        let id = row.id;

        let err = row.to_domain(Vec::new()).unwrap_err();

        assert_eq!(err.item_id, Some(id));
        assert!(err.reason.contains("expiration"));
    }

    #[test]
    fn missing_catalog_is_malformed() {
        let mut row = record();
        row.catalog_name = None;

        assert!(row.to_domain(Vec::new()).is_err());
    }
}

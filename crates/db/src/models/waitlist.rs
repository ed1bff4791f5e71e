use chrono::{DateTime, Utc};
use domain::WaitlistStatus;
use serde::{Deserialize, Serialize};
use shared::types::{EventId, UserId, WaitlistAuditLogId, WaitlistEntryId};
use sqlx::FromRow;

/// Waitlist entry (spec §3, §4.4).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub priority: i64,
    pub status: WaitlistStatus,
    pub joined_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub notes: Option<String>,
}

/// Input for `WaitlistRepository::join`.
#[derive(Debug, Clone)]
pub struct NewWaitlistEntry {
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub priority: i64,
    pub notes: Option<String>,
}

/// Append-only audit trail row for a waitlist entry transition.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaitlistAuditLog {
    pub id: WaitlistAuditLogId,
    pub entry_id: WaitlistEntryId,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

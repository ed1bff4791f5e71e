use chrono::{DateTime, Utc};
use domain::{BookingStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::types::{BookingId, BookingItemId, EventId, UserId};
use sqlx::FromRow;

/// Booking aggregate root (spec §3).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub booking_reference: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub booking_date: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub notes: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        domain::booking::is_expired(self.status, self.expires_at.unwrap_or(now), now)
    }
}

/// Input for `BookingRepository::create`.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: UserId,
    pub event_id: EventId,
    pub booking_reference: String,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One row per booking (spec §3: "one row per booking ... deleted with booking").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingItem {
    pub id: BookingItemId,
    pub booking_id: BookingId,
    pub price_per_item: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
    pub ticket_type: Option<String>,
}

/// Append-only audit trail row for a booking transition.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingAuditLog {
    pub id: shared::types::BookingAuditLogId,
    pub booking_id: BookingId,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

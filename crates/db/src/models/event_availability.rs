use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::types::EventId;
use sqlx::FromRow;

/// Local replica of an event's capacity counters (spec §3). Owned by the
/// events catalog service; the booking core only mutates the counters of
/// an existing row, never its identity fields outside the event subscriber.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventAvailability {
    pub event_id: EventId,
    pub event_name: String,
    pub total_capacity: i32,
    pub available: i32,
    pub reserved: i32,
    pub confirmed: i32,
    pub price: Decimal,
    pub version: i64,
    pub last_updated: DateTime<Utc>,
}

impl EventAvailability {
    pub fn is_sold_out(&self) -> bool {
        self.available <= 0
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.total_capacity == 0 {
            return 0.0;
        }
        (self.reserved + self.confirmed) as f64 / self.total_capacity as f64 * 100.0
    }
}

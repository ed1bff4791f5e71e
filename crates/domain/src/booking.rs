//! Pure booking state machine (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Refunded,
    Completed,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
            BookingStatus::Refunded => "refunded",
            BookingStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl BookingStatus {
    /// Whether `confirm` may be attempted from this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Whether `cancel` may be attempted from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// Which ledger release a cancellation from `old_status` must perform, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityRelease {
    Reserved,
    Confirmed,
    None,
}

/// spec §4.3 cancel step 4: "Capacity release by previous state: PENDING =>
/// release_reserved; CONFIRMED => release_confirmed; other states release
/// nothing."
pub fn release_for_cancel(old_status: BookingStatus) -> CapacityRelease {
    match old_status {
        BookingStatus::Pending => CapacityRelease::Reserved,
        BookingStatus::Confirmed => CapacityRelease::Confirmed,
        _ => CapacityRelease::None,
    }
}

/// Whether a PENDING booking's hold has lapsed as of `now`.
pub fn is_expired(status: BookingStatus, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    status == BookingStatus::Pending && expires_at < now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_confirm_or_cancel() {
        assert!(BookingStatus::Pending.can_confirm());
        assert!(BookingStatus::Pending.can_cancel());
    }

    #[test]
    fn confirmed_can_cancel_not_confirm() {
        assert!(!BookingStatus::Confirmed.can_confirm());
        assert!(BookingStatus::Confirmed.can_cancel());
    }

    #[test]
    fn terminal_states_cannot_cancel() {
        for s in [
            BookingStatus::Cancelled,
            BookingStatus::Expired,
            BookingStatus::Refunded,
            BookingStatus::Completed,
        ] {
            assert!(!s.can_cancel());
            assert!(!s.can_confirm());
        }
    }

    #[test]
    fn release_for_cancel_matches_spec_table() {
        assert_eq!(release_for_cancel(BookingStatus::Pending), CapacityRelease::Reserved);
        assert_eq!(release_for_cancel(BookingStatus::Confirmed), CapacityRelease::Confirmed);
        assert_eq!(release_for_cancel(BookingStatus::Expired), CapacityRelease::None);
    }
}

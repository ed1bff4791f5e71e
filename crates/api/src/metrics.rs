//! Prometheus metrics for the booking core.

use metrics::{counter, histogram};
use std::time::Instant;

pub mod names {
    pub const BOOKINGS_CREATED: &str = "bookings_created_total";
    pub const BOOKINGS_CONFIRMED: &str = "bookings_confirmed_total";
    pub const BOOKINGS_CANCELLED: &str = "bookings_cancelled_total";
    pub const BOOKINGS_EXPIRED: &str = "bookings_expired_total";
    pub const BOOKING_CONFLICTS: &str = "booking_capacity_conflicts_total";
    pub const WAITLIST_JOINS: &str = "waitlist_joins_total";
    pub const WAITLIST_NOTIFICATIONS_SENT: &str = "waitlist_notifications_sent_total";
    pub const LOCK_ACQUIRE_DURATION: &str = "lock_acquire_duration_seconds";
}

pub fn record_booking_created(event_id: &str) {
    counter!(names::BOOKINGS_CREATED, "event_id" => event_id.to_string()).increment(1);
}

pub fn record_booking_confirmed(event_id: &str) {
    counter!(names::BOOKINGS_CONFIRMED, "event_id" => event_id.to_string()).increment(1);
}

pub fn record_booking_cancelled(event_id: &str) {
    counter!(names::BOOKINGS_CANCELLED, "event_id" => event_id.to_string()).increment(1);
}

pub fn record_bookings_expired(event_id: &str, count: u64) {
    counter!(names::BOOKINGS_EXPIRED, "event_id" => event_id.to_string()).increment(count);
}

pub fn record_capacity_conflict(event_id: &str) {
    counter!(names::BOOKING_CONFLICTS, "event_id" => event_id.to_string()).increment(1);
}

pub fn record_waitlist_join(event_id: &str) {
    counter!(names::WAITLIST_JOINS, "event_id" => event_id.to_string()).increment(1);
}

pub fn record_waitlist_notifications_sent(event_id: &str, count: u64) {
    counter!(names::WAITLIST_NOTIFICATIONS_SENT, "event_id" => event_id.to_string()).increment(count);
}

/// Timer helper for the lock-acquire critical path.
pub struct LockTimer {
    start: Instant,
}

impl LockTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn record(self) {
        histogram!(names::LOCK_ACQUIRE_DURATION).record(self.start.elapsed().as_secs_f64());
    }
}

pub fn init_metrics() -> metrics_exporter_prometheus::PrometheusHandle {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder.install_recorder().expect("Failed to install Prometheus metrics recorder")
}

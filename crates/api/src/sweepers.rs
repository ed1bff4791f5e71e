//! The two scheduled loops named in spec §2 component 9: expire-pending-
//! bookings and expire-notified-waitlist-entries. Each runs on its own
//! configurable interval and logs failures rather than aborting the loop.

use crate::services::{BookingService, WaitlistService};
use crate::state::AppState;

pub fn spawn_sweepers(state: AppState) {
    let booking_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(booking_state.settings.booking_expiry_sweep_interval);
        loop {
            interval.tick().await;
            match BookingService::expire_pending(&booking_state).await {
                Ok(count) if count > 0 => tracing::info!(count, "expired pending bookings"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "booking expiry sweep failed"),
            }
        }
    });

    let waitlist_state = state;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(waitlist_state.settings.waitlist_expiry_sweep_interval);
        loop {
            interval.tick().await;
            match WaitlistService::expire_notified(&waitlist_state).await {
                Ok(count) if count > 0 => tracing::info!(count, "expired notified waitlist entries"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "waitlist expiry sweep failed"),
            }
        }
    });
}

//! Orchestrates the Booking lifecycle across the Locker, Capacity Ledger,
//! Booking Repository, and Event Publisher (spec §4.3).

use chrono::{DateTime, Utc};
use db::{AvailabilityRepository, Booking, BookingRepository, NewBooking};
use domain::{release_for_cancel, BookingStatus, CapacityRelease};
use serde_json::json;
use shared::types::{BookingId, EventId, UserId};
use shared::{AppError, AppResult, DomainError};
use uuid::Uuid;

use crate::state::AppState;

const MAX_VERSION_CONFLICT_RETRIES: u32 = 3;

/// `LockError` lives in `integrations`, `AppError` in `shared` — neither
/// crate can carry a blanket `From` impl for the other without an orphan
/// violation, so call sites convert explicitly.
pub(crate) fn lock_err(e: integrations::LockError) -> AppError {
    AppError::Locked(e.to_string())
}

pub struct BookingService;

#[derive(Debug, Clone)]
pub struct CreateBookingInput {
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub notes: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateBookingResult {
    pub booking: Booking,
    pub expires_at: DateTime<Utc>,
}

impl BookingService {
    /// spec §4.3 create.
    pub async fn create(state: &AppState, input: CreateBookingInput) -> AppResult<CreateBookingResult> {
        if input.quantity < 1 || input.quantity > 10 {
            return Err(AppError::Validation("quantity must be between 1 and 10".to_string()));
        }

        let availability = AvailabilityRepository::find_by_event(&state.pool, input.event_id)
            .await?
            .ok_or_else(|| DomainError::EventNotFound(input.event_id.to_string()))?;

        let total_amount = availability.price * rust_decimal::Decimal::from(input.quantity);
        let expires_at = Utc::now() + chrono::Duration::from_std(state.settings.booking_hold).unwrap();

        let lock_key = format!("booking:event:{}", input.event_id);
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::create_locked(state, &input, total_amount, expires_at).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let booking = result?;

        let payload = json!({
            "type": "BookingCreated",
            "booking_id": booking.id.to_string(),
            "event_id": booking.event_id.to_string(),
            "user_id": booking.user_id.to_string(),
            "booking_data": {
                "booking_reference": booking.booking_reference,
                "quantity": booking.quantity,
                "total_amount": booking.total_amount.to_string(),
                "status": booking.status.to_string(),
            },
        });
        if let Err(e) = state.publisher.publish_booking_created(&payload).await {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to publish BookingCreated");
        }

        crate::metrics::record_booking_created(&input.event_id.to_string());

        Ok(CreateBookingResult { booking, expires_at })
    }

    async fn create_locked(
        state: &AppState,
        input: &CreateBookingInput,
        total_amount: rust_decimal::Decimal,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let mut attempt = 0;
        loop {
            let mut tx = state.pool.begin().await?;

            let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, input.event_id)
                .await?
                .ok_or_else(|| DomainError::EventNotFound(input.event_id.to_string()))?;

            let reserved = AvailabilityRepository::reserve(&mut tx, input.event_id, row.version, input.quantity).await?;

            let Some(_) = reserved else {
                let current = AvailabilityRepository::find_by_event(&state.pool, input.event_id).await?;
                let available = current.map(|c| c.available).unwrap_or(0);
                if available < input.quantity {
                    return Err(DomainError::InsufficientCapacity {
                        event_id: input.event_id.to_string(),
                        requested: input.quantity,
                        available,
                    }
                    .into());
                }
                attempt += 1;
                if attempt >= MAX_VERSION_CONFLICT_RETRIES {
                    return Err(DomainError::Conflict(input.event_id.to_string()).into());
                }
                continue;
            };

            let reference = generate_booking_reference(Utc::now());
            let booking = BookingRepository::create(
                &mut tx,
                NewBooking {
                    user_id: input.user_id,
                    event_id: input.event_id,
                    booking_reference: reference,
                    quantity: input.quantity,
                    total_amount,
                    currency: "USD".to_string(),
                    expires_at,
                    notes: input.notes.clone(),
                    ip_address: input.ip_address.clone(),
                    user_agent: input.user_agent.clone(),
                },
            )
            .await?;

            tx.commit().await?;
            return Ok(booking);
        }
    }

    /// spec §4.3 confirm.
    pub async fn confirm(state: &AppState, booking_id: BookingId, user_id: Option<UserId>) -> AppResult<Booking> {
        let lock_key = format!("booking:confirm:{booking_id}");
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::confirm_locked(state, booking_id, user_id).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let booking = result?;

        let payload = json!({
            "type": "BookingConfirmed",
            "booking_id": booking.id.to_string(),
            "event_id": booking.event_id.to_string(),
            "user_id": booking.user_id.to_string(),
            "booking_data": { "status": booking.status.to_string() },
        });
        if let Err(e) = state.publisher.publish_booking_confirmed(&payload).await {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to publish BookingConfirmed");
        }

        let email_job = json!({
            "booking_id": booking.id.to_string(),
            "user_id": booking.user_id.to_string(),
            "booking_data": {
                "booking_reference": booking.booking_reference,
                "quantity": booking.quantity,
                "total_amount": booking.total_amount.to_string(),
            },
        });
        if let Err(e) = state.publisher.enqueue_email("BookingConfirmationEmail", &email_job).await {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to enqueue BookingConfirmationEmail");
        }

        crate::metrics::record_booking_confirmed(&booking.event_id.to_string());

        Ok(booking)
    }

    async fn confirm_locked(state: &AppState, booking_id: BookingId, user_id: Option<UserId>) -> AppResult<Booking> {
        let mut tx = state.pool.begin().await?;

        let booking = BookingRepository::find_by_id_in_tx(&mut tx, booking_id)
            .await?
            .ok_or_else(|| DomainError::BookingNotFound(booking_id.to_string()))?;

        if let Some(uid) = user_id {
            if booking.user_id != uid {
                return Err(AppError::Forbidden);
            }
        }

        if booking.status != BookingStatus::Pending {
            return Err(DomainError::NotPending(booking_id.to_string()).into());
        }

        let now = Utc::now();
        if booking.is_expired(now) {
            // The row was still PENDING at load but its hold has lapsed;
            // mark it EXPIRED here rather than leaving it for the sweeper.
            // Capacity release still happens via the sweeper's own pass if
            // it beats us to it (`expire` is a no-op once already EXPIRED).
            let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, booking.event_id).await?;
            if let Some(expired) = BookingRepository::expire(&mut tx, booking.id, booking.version).await? {
                if let Some(row) = row {
                    AvailabilityRepository::release_reserved(&mut tx, booking.event_id, row.version, booking.quantity)
                        .await?;
                }
                BookingRepository::audit(
                    &mut tx,
                    expired.id,
                    "EXPIRE",
                    Some("status"),
                    Some("pending"),
                    Some("expired"),
                    None,
                    Some("Hold expired"),
                )
                .await?;
            }
            tx.commit().await?;
            return Err(DomainError::Expired(booking_id.to_string()).into());
        }

        let confirmed = BookingRepository::confirm(&mut tx, booking.id, booking.version)
            .await?
            .ok_or_else(|| DomainError::Conflict(booking_id.to_string()))?;

        let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, booking.event_id)
            .await?
            .ok_or_else(|| DomainError::EventNotFound(booking.event_id.to_string()))?;
        AvailabilityRepository::confirm(&mut tx, booking.event_id, row.version, booking.quantity)
            .await?
            .ok_or_else(|| DomainError::Conflict(booking.event_id.to_string()))?;

        BookingRepository::audit(
            &mut tx,
            confirmed.id,
            "CONFIRM",
            Some("status"),
            Some("pending"),
            Some("confirmed"),
            None,
            Some("Booking confirmed"),
        )
        .await?;

        tx.commit().await?;
        Ok(confirmed)
    }

    /// spec §4.3 cancel.
    pub async fn cancel(
        state: &AppState,
        booking_id: BookingId,
        user_id: Option<UserId>,
        reason: Option<String>,
    ) -> AppResult<Booking> {
        let lock_key = format!("booking:cancel:{booking_id}");
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::cancel_locked(state, booking_id, user_id, reason).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let (booking, old_status, released_qty) = result?;

        let payload = json!({
            "type": "BookingCancelled",
            "booking_id": booking.id.to_string(),
            "event_id": booking.event_id.to_string(),
            "user_id": booking.user_id.to_string(),
            "booking_data": { "status": booking.status.to_string() },
        });
        if let Err(e) = state.publisher.publish_booking_cancelled(&payload).await {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to publish BookingCancelled");
        }
        crate::metrics::record_booking_cancelled(&booking.event_id.to_string());

        if matches!(old_status, BookingStatus::Pending | BookingStatus::Confirmed) {
            if let Err(e) = crate::services::WaitlistService::notify_next(state, booking.event_id, released_qty).await {
                tracing::warn!(error = %e, event_id = %booking.event_id, "failed to notify waitlist after cancel");
            }
        }

        Ok(booking)
    }

    async fn cancel_locked(
        state: &AppState,
        booking_id: BookingId,
        user_id: Option<UserId>,
        reason: Option<String>,
    ) -> AppResult<(Booking, BookingStatus, i32)> {
        let mut tx = state.pool.begin().await?;

        let booking = BookingRepository::find_by_id_in_tx(&mut tx, booking_id)
            .await?
            .ok_or_else(|| DomainError::BookingNotFound(booking_id.to_string()))?;

        if let Some(uid) = user_id {
            if booking.user_id != uid {
                return Err(AppError::Forbidden);
            }
        }

        if !booking.status.can_cancel() {
            return Err(DomainError::NotCancellable(booking_id.to_string()).into());
        }

        let old_status = booking.status;
        let cancelled = BookingRepository::cancel(&mut tx, booking.id, booking.version)
            .await?
            .ok_or_else(|| DomainError::Conflict(booking_id.to_string()))?;

        match release_for_cancel(old_status) {
            CapacityRelease::Reserved => {
                let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, booking.event_id).await?;
                if let Some(row) = row {
                    AvailabilityRepository::release_reserved(&mut tx, booking.event_id, row.version, booking.quantity)
                        .await?;
                }
            }
            CapacityRelease::Confirmed => {
                let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, booking.event_id).await?;
                if let Some(row) = row {
                    AvailabilityRepository::release_confirmed(&mut tx, booking.event_id, row.version, booking.quantity)
                        .await?;
                }
            }
            CapacityRelease::None => {}
        }

        BookingRepository::audit(
            &mut tx,
            cancelled.id,
            "CANCEL",
            Some("status"),
            None,
            Some("cancelled"),
            None,
            reason.as_deref(),
        )
        .await?;

        tx.commit().await?;
        Ok((cancelled, old_status, booking.quantity))
    }

    /// spec §4.3 expire sweeper.
    pub async fn expire_pending(state: &AppState) -> AppResult<u64> {
        let mut tx = state.pool.begin().await?;
        let now = Utc::now();
        let expired = BookingRepository::find_expired_pending(&mut tx, now).await?;

        let mut affected_events: std::collections::HashMap<EventId, i32> = std::collections::HashMap::new();

        for booking in &expired {
            let updated = BookingRepository::expire(&mut tx, booking.id, booking.version).await?;
            let Some(updated) = updated else { continue };

            let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, booking.event_id).await?;
            if let Some(row) = row {
                AvailabilityRepository::release_reserved(&mut tx, booking.event_id, row.version, booking.quantity)
                    .await?;
            }

            BookingRepository::audit(
                &mut tx,
                updated.id,
                "EXPIRE",
                Some("status"),
                Some("pending"),
                Some("expired"),
                None,
                Some("Hold expired"),
            )
            .await?;

            *affected_events.entry(booking.event_id).or_insert(0) += booking.quantity;
        }

        tx.commit().await?;

        crate::metrics::record_bookings_expired("all", expired.len() as u64);

        for (event_id, qty) in affected_events {
            if let Err(e) = crate::services::WaitlistService::notify_next(state, event_id, qty).await {
                tracing::warn!(error = %e, %event_id, "failed to notify waitlist after expiry sweep");
            }
        }

        Ok(expired.len() as u64)
    }

    pub async fn get_by_id(state: &AppState, booking_id: BookingId, user_id: UserId, is_admin: bool) -> AppResult<Booking> {
        let booking = BookingRepository::find_by_id(&state.pool, booking_id)
            .await?
            .ok_or_else(|| DomainError::BookingNotFound(booking_id.to_string()))?;
        if !is_admin && booking.user_id != user_id {
            return Err(AppError::NotFound(booking_id.to_string()));
        }
        Ok(booking)
    }
}

/// `BK-YYYYMMDD-<8 hex upper>` (spec §3).
fn generate_booking_reference(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("BK-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_reference_matches_expected_shape() {
        let now = DateTime::parse_from_rfc3339("2026-07-31T12:00:00Z").unwrap().with_timezone(&Utc);
        let reference = generate_booking_reference(now);
        assert!(reference.starts_with("BK-20260731-"));
        assert_eq!(reference.len(), "BK-20260731-".len() + 8);
    }
}

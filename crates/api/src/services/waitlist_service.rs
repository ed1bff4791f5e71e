//! Orchestrates the Waitlist lifecycle across the Locker, Capacity Ledger,
//! Waitlist Repository, and Event Publisher (spec §4.4).

use chrono::Utc;
use db::{AvailabilityRepository, WaitlistEntry, WaitlistRepository};
use domain::{next_priority, notify_next, Candidate, WaitlistStatus};
use serde_json::json;
use shared::types::{EventId, UserId, WaitlistEntryId};
use shared::{AppError, AppResult, DomainError};

use crate::services::booking_service::lock_err;
use crate::state::AppState;

pub struct WaitlistService;

#[derive(Debug, Clone)]
pub struct JoinWaitlistInput {
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl WaitlistService {
    /// spec §4.4 join.
    pub async fn join(state: &AppState, input: JoinWaitlistInput) -> AppResult<WaitlistEntry> {
        let lock_key = format!("waitlist:event:{}", input.event_id);
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::join_locked(state, &input).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let entry = result?;

        let payload = json!({
            "type": "WaitlistJoined",
            "entry_id": entry.id.to_string(),
            "event_id": entry.event_id.to_string(),
            "user_id": entry.user_id.to_string(),
            "booking_data": { "priority": entry.priority, "quantity": entry.quantity },
        });
        if let Err(e) = state.publisher.publish_waitlist_joined(&payload).await {
            tracing::warn!(error = %e, entry_id = %entry.id, "failed to publish WaitlistJoined");
        }

        let email_job = json!({
            "entry_id": entry.id.to_string(),
            "user_id": entry.user_id.to_string(),
            "waitlist_data": { "priority": entry.priority, "quantity": entry.quantity },
        });
        if let Err(e) = state.publisher.enqueue_email("WaitlistJoinedEmail", &email_job).await {
            tracing::warn!(error = %e, entry_id = %entry.id, "failed to enqueue WaitlistJoinedEmail");
        }

        crate::metrics::record_waitlist_join(&entry.event_id.to_string());

        Ok(entry)
    }

    async fn join_locked(state: &AppState, input: &JoinWaitlistInput) -> AppResult<WaitlistEntry> {
        let mut tx = state.pool.begin().await?;

        if WaitlistRepository::find_active_for_user(&mut tx, input.user_id, input.event_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateActiveWaitlist(input.event_id.to_string()).into());
        }

        let availability = AvailabilityRepository::find_by_event_in_tx(&mut tx, input.event_id)
            .await?
            .ok_or_else(|| DomainError::EventNotFound(input.event_id.to_string()))?;

        if availability.available >= input.quantity {
            return Err(DomainError::HasAvailability(input.event_id.to_string()).into());
        }

        let active_priorities = WaitlistRepository::active_priorities(&mut tx, input.event_id).await?;
        let priority = next_priority(&active_priorities);

        let entry = WaitlistRepository::join(
            &mut tx,
            db::NewWaitlistEntry {
                user_id: input.user_id,
                event_id: input.event_id,
                quantity: input.quantity,
                priority,
                notes: input.notes.clone(),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// spec §4.4 cancel.
    pub async fn cancel(state: &AppState, entry_id: WaitlistEntryId, user_id: Option<UserId>) -> AppResult<WaitlistEntry> {
        let lock_key = format!("waitlist:cancel:{entry_id}");
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::cancel_locked(state, entry_id, user_id).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let entry = result?;

        let payload = json!({
            "type": "WaitlistCancelled",
            "entry_id": entry.id.to_string(),
            "event_id": entry.event_id.to_string(),
            "user_id": entry.user_id.to_string(),
            "booking_data": {},
        });
        if let Err(e) = state.publisher.publish_waitlist_cancelled(&payload).await {
            tracing::warn!(error = %e, entry_id = %entry.id, "failed to publish WaitlistCancelled");
        }

        let email_job = json!({
            "entry_id": entry.id.to_string(),
            "user_id": entry.user_id.to_string(),
            "waitlist_data": {},
        });
        if let Err(e) = state.publisher.enqueue_email("WaitlistCancellationEmail", &email_job).await {
            tracing::warn!(error = %e, entry_id = %entry.id, "failed to enqueue WaitlistCancellationEmail");
        }

        Ok(entry)
    }

    async fn cancel_locked(state: &AppState, entry_id: WaitlistEntryId, user_id: Option<UserId>) -> AppResult<WaitlistEntry> {
        let mut tx = state.pool.begin().await?;

        let entry = WaitlistRepository::find_by_id_in_tx(&mut tx, entry_id)
            .await?
            .ok_or_else(|| DomainError::WaitlistEntryNotFound(entry_id.to_string()))?;

        if let Some(uid) = user_id {
            if entry.user_id != uid {
                return Err(AppError::Forbidden);
            }
        }

        if !entry.status.can_cancel() {
            return Err(DomainError::WaitlistNotCancellable(entry_id.to_string()).into());
        }

        let cancelled = WaitlistRepository::cancel(&mut tx, entry.id, entry.version)
            .await?
            .ok_or_else(|| DomainError::Conflict(entry_id.to_string()))?;

        WaitlistRepository::audit(
            &mut tx,
            cancelled.id,
            "CANCEL",
            Some("status"),
            None,
            Some("cancelled"),
            None,
            Some("Cancelled by caller"),
        )
        .await?;

        tx.commit().await?;
        Ok(cancelled)
    }

    /// spec §4.4 `notify_next(event, available_qty)`: best-effort, invoked
    /// from the booking cancel/expire flows and never allowed to fail the
    /// caller's own transaction.
    pub async fn notify_next(state: &AppState, event_id: EventId, available_qty: i32) -> AppResult<u32> {
        if available_qty <= 0 {
            return Ok(0);
        }

        let lock_key = format!("waitlist:notify:{event_id}");
        let token = state
            .locker
            .acquire(&lock_key, state.settings.lock_hold_ttl, state.settings.lock_wait_budget)
            .await
            .map_err(lock_err)?;

        let result = Self::notify_next_locked(state, event_id, available_qty).await;

        state.locker.release(&lock_key, &token).await.map_err(lock_err)?;

        let notified = result?;
        let count = notified.len() as u32;

        if count > 0 {
            let payload = json!({
                "type": "WaitlistNotificationsSent",
                "event_id": event_id.to_string(),
                "booking_data": { "count": count },
            });
            if let Err(e) = state.publisher.publish_waitlist_notifications_sent(&payload).await {
                tracing::warn!(error = %e, %event_id, "failed to publish WaitlistNotificationsSent");
            }

            // Emit one notification task per promoted entry (spec §4.4
            // notify_next step: "emit notification task"), best-effort.
            for entry in &notified {
                let email_job = json!({
                    "entry_id": entry.id.to_string(),
                    "user_id": entry.user_id.to_string(),
                    "waitlist_data": { "quantity": entry.quantity },
                    "expires_at": entry.expires_at,
                });
                if let Err(e) = state.publisher.enqueue_email("WaitlistNotificationEmail", &email_job).await {
                    tracing::warn!(error = %e, entry_id = %entry.id, "failed to enqueue WaitlistNotificationEmail");
                }
            }

            crate::metrics::record_waitlist_notifications_sent(&event_id.to_string(), count as u64);
        }

        Ok(count)
    }

    async fn notify_next_locked(state: &AppState, event_id: EventId, available_qty: i32) -> AppResult<Vec<WaitlistEntry>> {
        let mut tx = state.pool.begin().await?;

        let pending = WaitlistRepository::pending_for_event(&mut tx, event_id).await?;
        let candidates = pending
            .iter()
            .map(|e| Candidate {
                id: e.id,
                priority: e.priority,
                quantity: e.quantity,
            })
            .collect();

        let plan = notify_next(candidates, available_qty);
        let expires_at = Utc::now() + chrono::Duration::from_std(state.settings.waitlist_notification_window).unwrap();

        let mut promoted = Vec::new();
        for entry_id in plan.promoted {
            let entry = pending.iter().find(|e| e.id == entry_id).expect("promoted id came from pending set");
            let notified = WaitlistRepository::notify(&mut tx, entry.id, entry.version, expires_at).await?;
            if let Some(notified) = notified {
                WaitlistRepository::audit(
                    &mut tx,
                    notified.id,
                    "NOTIFY",
                    Some("status"),
                    Some("pending"),
                    Some("notified"),
                    None,
                    Some("Capacity became available"),
                )
                .await?;
                promoted.push(notified);
            }
        }

        tx.commit().await?;
        Ok(promoted)
    }

    /// spec §4.4 expire sweeper.
    pub async fn expire_notified(state: &AppState) -> AppResult<u64> {
        let mut tx = state.pool.begin().await?;
        let now = Utc::now();
        let expired = WaitlistRepository::find_expired_notified(&mut tx, now).await?;

        for entry in &expired {
            if let Some(updated) = WaitlistRepository::expire(&mut tx, entry.id, entry.version).await? {
                WaitlistRepository::audit(
                    &mut tx,
                    updated.id,
                    "EXPIRE",
                    Some("status"),
                    Some("notified"),
                    Some("expired"),
                    None,
                    Some("Notification window elapsed"),
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(expired.len() as u64)
    }

    pub async fn position(state: &AppState, entry_id: WaitlistEntryId) -> AppResult<i64> {
        let entry = WaitlistRepository::find_by_id(&state.pool, entry_id)
            .await?
            .ok_or_else(|| DomainError::WaitlistEntryNotFound(entry_id.to_string()))?;
        if entry.status != WaitlistStatus::Pending {
            return Ok(0);
        }
        Ok(WaitlistRepository::position(&state.pool, entry.event_id, entry.priority).await?)
    }

    /// spec §4.4 eligibility check (read-only).
    pub async fn check_eligibility(state: &AppState, user_id: UserId, event_id: EventId, quantity: i32) -> AppResult<EligibilityResult> {
        let mut tx = state.pool.begin().await?;

        if WaitlistRepository::find_active_for_user(&mut tx, user_id, event_id).await?.is_some() {
            return Ok(EligibilityResult {
                eligible: false,
                reason: Some("already on the waitlist for this event".to_string()),
            });
        }

        let availability = AvailabilityRepository::find_by_event_in_tx(&mut tx, event_id).await?;
        let Some(availability) = availability else {
            return Ok(EligibilityResult {
                eligible: false,
                reason: Some("event not found".to_string()),
            });
        };

        if availability.available >= quantity {
            return Ok(EligibilityResult {
                eligible: false,
                reason: Some("capacity is currently available; book directly instead".to_string()),
            });
        }

        Ok(EligibilityResult { eligible: true, reason: None })
    }
}

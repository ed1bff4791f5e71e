use chrono::{DateTime, Utc};
use shared::types::{EventId, UserId, WaitlistAuditLogId, WaitlistEntryId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{NewWaitlistEntry, WaitlistAuditLog, WaitlistEntry};

pub struct WaitlistRepository;

impl WaitlistRepository {
    /// Active (PENDING|NOTIFIED) entries for `(user_id, event_id)` — used to
    /// enforce "at most one active entry" (spec §3 invariant, join step 2).
    pub async fn find_active_for_user(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries
            WHERE user_id = $1 AND event_id = $2 AND status IN ('pending', 'notified')
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_i64())
        .fetch_optional(&mut **tx)
        .await
    }

    /// Active priorities for an event, to compute the next join priority
    /// (spec §4.4 join step 4) under the event-scoped lock.
    pub async fn active_priorities(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT priority FROM waitlist_entries WHERE event_id = $1 AND status IN ('pending', 'notified')",
        )
        .bind(event_id.as_i64())
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    pub async fn join(
        tx: &mut Transaction<'_, Postgres>,
        input: NewWaitlistEntry,
    ) -> Result<WaitlistEntry, sqlx::Error> {
        let id = WaitlistEntryId::new();
        let entry = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            INSERT INTO waitlist_entries (id, user_id, event_id, quantity, priority, status, joined_at, version, notes)
            VALUES ($1, $2, $3, $4, $5, 'pending', now(), 1, $6)
            RETURNING id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            "#,
        )
        .bind(id.as_uuid())
        .bind(input.user_id.as_uuid())
        .bind(input.event_id.as_i64())
        .bind(input.quantity)
        .bind(input.priority)
        .bind(&input.notes)
        .fetch_one(&mut **tx)
        .await?;

        Self::audit(tx, entry.id, "JOIN", None, None, None, None, Some("Joined waitlist")).await?;
        Ok(entry)
    }

    pub async fn find_by_id(pool: &PgPool, id: WaitlistEntryId) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: WaitlistEntryId,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn cancel(
        tx: &mut Transaction<'_, Postgres>,
        id: WaitlistEntryId,
        expected_version: i64,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            UPDATE waitlist_entries
            SET status = 'cancelled', cancelled_at = now(), version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
    }

    /// All PENDING entries for an event, ordered by priority — fed to
    /// `domain::notify_next` to compute the promotion plan.
    pub async fn pending_for_event(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries
            WHERE event_id = $1 AND status = 'pending'
            ORDER BY priority ASC
            FOR UPDATE
            "#,
        )
        .bind(event_id.as_i64())
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn notify(
        tx: &mut Transaction<'_, Postgres>,
        id: WaitlistEntryId,
        expected_version: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            UPDATE waitlist_entries
            SET status = 'notified', notified_at = now(), expires_at = $3, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .bind(expires_at)
        .fetch_optional(&mut **tx)
        .await
    }

    /// spec §4.4 expire sweeper: NOTIFIED entries past `expires_at`.
    pub async fn find_expired_notified(
        tx: &mut Transaction<'_, Postgres>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries
            WHERE status = 'notified' AND expires_at < $1
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn expire(
        tx: &mut Transaction<'_, Postgres>,
        id: WaitlistEntryId,
        expected_version: i64,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            UPDATE waitlist_entries
            SET status = 'expired', version = version + 1
            WHERE id = $1 AND status = 'notified' AND version = $2
            RETURNING id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn position(
        pool: &PgPool,
        event_id: EventId,
        priority: i64,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM waitlist_entries WHERE event_id = $1 AND status IN ('pending', 'notified') AND priority < $2",
        )
        .bind(event_id.as_i64())
        .bind(priority)
        .fetch_one(pool)
        .await?;
        Ok(row.0 + 1)
    }

    pub async fn list_for_user(pool: &PgPool, user_id: UserId) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries WHERE user_id = $1 ORDER BY joined_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_event(pool: &PgPool, event_id: EventId) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, user_id, event_id, quantity, priority, status, joined_at, notified_at, expires_at, cancelled_at, version, notes
            FROM waitlist_entries WHERE event_id = $1 ORDER BY priority ASC
            "#,
        )
        .bind(event_id.as_i64())
        .fetch_all(pool)
        .await
    }

    pub async fn audit(
        tx: &mut Transaction<'_, Postgres>,
        entry_id: WaitlistEntryId,
        action: &str,
        field_name: Option<&str>,
        old_value: Option<&str>,
        new_value: Option<&str>,
        changed_by: Option<UserId>,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO waitlist_audit_log (id, entry_id, action, field_name, old_value, new_value, changed_by, changed_at, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), $8)
            "#,
        )
        .bind(WaitlistAuditLogId::new().as_uuid())
        .bind(entry_id.as_uuid())
        .bind(action)
        .bind(field_name)
        .bind(old_value)
        .bind(new_value)
        .bind(changed_by.map(|u| *u.as_uuid()))
        .bind(reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_audit(pool: &PgPool, entry_id: WaitlistEntryId) -> Result<Vec<WaitlistAuditLog>, sqlx::Error> {
        sqlx::query_as::<_, WaitlistAuditLog>(
            "SELECT id, entry_id, action, field_name, old_value, new_value, changed_by, changed_at, reason FROM waitlist_audit_log WHERE entry_id = $1 ORDER BY changed_at ASC",
        )
        .bind(entry_id.as_uuid())
        .fetch_all(pool)
        .await
    }
}

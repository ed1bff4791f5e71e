use chrono::{DateTime, Utc};
use domain::BookingStatus;
use shared::types::{BookingAuditLogId, BookingId, BookingItemId, EventId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Booking, BookingAuditLog, BookingItem, NewBooking};

pub struct BookingRepository;

impl BookingRepository {
    /// Insert the booking header, its single line item, and a `CREATE`
    /// audit row, all within the caller's transaction (spec §4.3 create
    /// step 5). The caller has already reserved capacity in the same
    /// transaction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: NewBooking,
    ) -> Result<Booking, sqlx::Error> {
        let id = BookingId::new();

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, version, notes, ip_address, user_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 'pending', now(), $8, 1, $9, $10, $11, now(), now())
            RETURNING id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(input.user_id.as_uuid())
        .bind(input.event_id.as_i64())
        .bind(&input.booking_reference)
        .bind(input.quantity)
        .bind(input.total_amount)
        .bind(&input.currency)
        .bind(input.expires_at)
        .bind(&input.notes)
        .bind(&input.ip_address)
        .bind(&input.user_agent)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO booking_items (id, booking_id, price_per_item, quantity, total_price, ticket_type)
            VALUES ($1, $2, $3, $4, $3 * $4, NULL)
            "#,
        )
        .bind(BookingItemId::new().as_uuid())
        .bind(booking.id.as_uuid())
        .bind(input.total_amount / rust_decimal::Decimal::from(input.quantity.max(1)))
        .bind(input.quantity)
        .execute(&mut **tx)
        .await?;

        Self::audit(tx, booking.id, "CREATE", None, None, None, None, Some("Booking created"))
            .await?;

        Ok(booking)
    }

    pub async fn find_by_id(pool: &PgPool, id: BookingId) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn list_items(pool: &PgPool, booking_id: BookingId) -> Result<Vec<BookingItem>, sqlx::Error> {
        sqlx::query_as::<_, BookingItem>(
            "SELECT id, booking_id, price_per_item, quantity, total_price, ticket_type FROM booking_items WHERE booking_id = $1",
        )
        .bind(booking_id.as_uuid())
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        status: Option<BookingStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Booking>, i64), sqlx::Error> {
        let offset = (page.max(1) - 1) * page_size;
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND ($2::booking_status IS NULL OR status = $2)",
        )
        .bind(user_id.as_uuid())
        .bind(status)
        .fetch_one(pool)
        .await?;

        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings
            WHERE user_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            ORDER BY booking_date DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(status)
        .bind(offset)
        .bind(page_size)
        .fetch_all(pool)
        .await?;

        Ok((bookings, total.0))
    }

    pub async fn list_admin(
        pool: &PgPool,
        status: Option<BookingStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Booking>, i64), sqlx::Error> {
        let offset = (page.max(1) - 1) * page_size;
        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE ($1::booking_status IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(pool)
                .await?;

        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
            ORDER BY booking_date DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(status)
        .bind(offset)
        .bind(page_size)
        .fetch_all(pool)
        .await?;

        Ok((bookings, total.0))
    }

    /// spec §4.3 confirm step 4: set CONFIRMED, payment COMPLETED, bump version.
    pub async fn confirm(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
        expected_version: i64,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'completed', confirmed_at = now(), version = version + 1, updated_at = now()
            WHERE id = $1 AND status = 'pending' AND version = $2
            RETURNING id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
    }

    /// spec §4.3 cancel step 3.
    pub async fn cancel(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
        expected_version: i64,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancelled_at = now(), version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Admin direct status override (not in spec.md's state machine, but
    /// named by its admin endpoint list: COMPLETED/REFUNDED transitions).
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
        expected_version: i64,
        status: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3, version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .bind(status)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete(tx: &mut Transaction<'_, Postgres>, id: BookingId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// spec §4.3 expire sweeper: select all PENDING bookings past `expires_at`.
    pub async fn find_expired_pending(
        tx: &mut Transaction<'_, Postgres>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings
            WHERE status = 'pending' AND expires_at < $1
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn expire(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
        expected_version: i64,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'expired', version = version + 1, updated_at = now()
            WHERE id = $1 AND status = 'pending' AND version = $2
            RETURNING id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn audit(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: BookingId,
        action: &str,
        field_name: Option<&str>,
        old_value: Option<&str>,
        new_value: Option<&str>,
        changed_by: Option<UserId>,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO booking_audit_log (id, booking_id, action, field_name, old_value, new_value, changed_by, changed_at, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), $8)
            "#,
        )
        .bind(BookingAuditLogId::new().as_uuid())
        .bind(booking_id.as_uuid())
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

    pub async fn list_audit(pool: &PgPool, booking_id: BookingId) -> Result<Vec<BookingAuditLog>, sqlx::Error> {
        sqlx::query_as::<_, BookingAuditLog>(
            "SELECT id, booking_id, action, field_name, old_value, new_value, changed_by, changed_at, reason FROM booking_audit_log WHERE booking_id = $1 ORDER BY changed_at ASC",
        )
        .bind(booking_id.as_uuid())
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_status_since(
        pool: &PgPool,
        status: BookingStatus,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = $1 AND booking_date >= $2")
                .bind(status)
                .bind(since)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    pub async fn find_by_event(pool: &PgPool, event_id: EventId) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, event_id, booking_reference, quantity, total_amount, currency, status, payment_status, booking_date, expires_at, confirmed_at, cancelled_at, version, notes, ip_address, user_agent, created_at, updated_at
            FROM bookings WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_i64())
        .fetch_all(pool)
        .await
    }
}

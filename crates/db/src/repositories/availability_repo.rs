use rust_decimal::Decimal;
use shared::types::EventId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::EventAvailability;

/// Transactional CRUD + optimistic-version-gated mutation of the capacity
/// ledger (spec §4.2). Every mutator binds `version = $expected` in its
/// WHERE clause and reports a zero-row update as a conflict by returning
/// `Ok(None)`; callers (the Booking/Waitlist services, already holding the
/// Locker) decide whether to retry or surface `Conflict`.
pub struct AvailabilityRepository;

impl AvailabilityRepository {
    pub async fn find_by_event(
        pool: &PgPool,
        event_id: EventId,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            SELECT event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            FROM event_availability
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_i64())
        .fetch_optional(pool)
        .await
    }

    /// Same read, locked within the caller's transaction — used immediately
    /// before a mutator so the bound `expected_version` reflects the latest
    /// committed write (spec §4.2: optimistic concurrency).
    pub async fn find_by_event_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            SELECT event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            FROM event_availability
            WHERE event_id = $1
            FOR UPDATE
            "#,
        )
        .bind(event_id.as_i64())
        .fetch_optional(&mut **tx)
        .await
    }

    /// `create(event, total, price, name)`: fails with a unique-violation
    /// if the row already exists; callers map that to `EventAlreadyExists`.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        event_name: &str,
        total_capacity: i32,
        price: Decimal,
    ) -> Result<EventAvailability, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            INSERT INTO event_availability (event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated)
            VALUES ($1, $2, $3, $3, 0, 0, $4, 1, now())
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(event_name)
        .bind(total_capacity)
        .bind(price)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn delete(tx: &mut Transaction<'_, Postgres>, event_id: EventId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM event_availability WHERE event_id = $1")
            .bind(event_id.as_i64())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// `reserve(event, qty)`: `available -= qty; reserved += qty; version += 1`,
    /// gated on `version = expected AND available >= qty`.
    pub async fn reserve(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        qty: i32,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET available = available - $3, reserved = reserved + $3, version = version + 1, last_updated = now()
            WHERE event_id = $1 AND version = $2 AND available >= $3
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(qty)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `confirm(event, qty)`: `reserved -= qty; confirmed += qty; version += 1`.
    pub async fn confirm(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        qty: i32,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET reserved = reserved - $3, confirmed = confirmed + $3, version = version + 1, last_updated = now()
            WHERE event_id = $1 AND version = $2 AND reserved >= $3
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(qty)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `release_reserved(event, qty)`: `reserved -= qty; available += qty; version += 1`.
    pub async fn release_reserved(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        qty: i32,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET reserved = reserved - $3, available = available + $3, version = version + 1, last_updated = now()
            WHERE event_id = $1 AND version = $2 AND reserved >= $3
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(qty)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `release_confirmed(event, qty)`: `confirmed -= qty; available += qty; version += 1`.
    pub async fn release_confirmed(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        qty: i32,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET confirmed = confirmed - $3, available = available + $3, version = version + 1, last_updated = now()
            WHERE event_id = $1 AND version = $2 AND confirmed >= $3
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(qty)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `update_total(event, new_total)`: `available = max(0, new_total - reserved - confirmed)`.
    pub async fn update_total(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        new_total: i32,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET total_capacity = $3,
                available = GREATEST(0, $3 - reserved - confirmed),
                version = version + 1,
                last_updated = now()
            WHERE event_id = $1 AND version = $2
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(new_total)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Refresh `event_name`/`price` without touching the capacity counters
    /// (spec §4.5 `EventUpdated`: metadata fields only, `total_capacity`
    /// goes through `update_total` instead).
    pub async fn update_metadata(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
        expected_version: i64,
        event_name: &str,
        price: Decimal,
    ) -> Result<Option<EventAvailability>, sqlx::Error> {
        sqlx::query_as::<_, EventAvailability>(
            r#"
            UPDATE event_availability
            SET event_name = $3, price = $4, version = version + 1, last_updated = now()
            WHERE event_id = $1 AND version = $2
            RETURNING event_id, event_name, total_capacity, available, reserved, confirmed, price, version, last_updated
            "#,
        )
        .bind(event_id.as_i64())
        .bind(expected_version)
        .bind(event_name)
        .bind(price)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Stats query (spec §4.2: "bypass the cache").
    pub async fn stats(pool: &PgPool) -> Result<AvailabilityStats, sqlx::Error> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) as total_events,
                COUNT(*) FILTER (WHERE available <= 0) as sold_out_events,
                COALESCE(SUM(reserved + confirmed), 0) as total_booked
            FROM event_availability
            "#,
        )
        .fetch_one(pool)
        .await?;
        Ok(AvailabilityStats {
            total_events: row.0,
            sold_out_events: row.1,
            total_booked: row.2,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AvailabilityStats {
    pub total_events: i64,
    pub sold_out_events: i64,
    pub total_booked: i64,
}

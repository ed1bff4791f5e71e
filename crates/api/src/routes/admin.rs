use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use db::{Booking, BookingRepository};
use domain::BookingStatus;
use serde::{Deserialize, Serialize};
use shared::types::BookingId;
use shared::DomainError;

use crate::{
    auth::AdminUser,
    error::ApiResult,
    routes::bookings::PaginatedBookings,
    services::BookingService,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListAdminBookingsQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListAdminBookingsQuery>,
) -> ApiResult<Json<PaginatedBookings>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);
    let (bookings, total) = BookingRepository::list_admin(&state.pool, query.status, page, page_size).await?;
    Ok(Json(PaginatedBookings { bookings, total, page, page_size }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

/// Admin-only direct status override, covering the COMPLETED/REFUNDED
/// transitions the user-facing state machine doesn't expose (spec §4.3
/// state diagram: "(admin/ops) ⇒ COMPLETED | REFUNDED").
pub async fn update_booking_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<BookingId>,
    Json(body): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Booking>> {
    let mut tx = state.pool.begin().await?;
    let booking = BookingRepository::find_by_id_in_tx(&mut tx, id)
        .await?
        .ok_or_else(|| DomainError::BookingNotFound(id.to_string()))?;

    let updated = BookingRepository::set_status(&mut tx, id, booking.version, body.status)
        .await?
        .ok_or_else(|| DomainError::Conflict(id.to_string()))?;

    BookingRepository::audit(
        &mut tx,
        updated.id,
        "ADMIN_STATUS_CHANGE",
        Some("status"),
        Some(&booking.status.to_string()),
        Some(&updated.status.to_string()),
        None,
        Some("Admin override"),
    )
    .await?;

    tx.commit().await?;
    Ok(Json(updated))
}

pub async fn delete_booking(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<BookingId>) -> ApiResult<()> {
    let mut tx = state.pool.begin().await?;
    BookingRepository::delete(&mut tx, id).await?;
    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BookingStats {
    pub period_days: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub expired: i64,
    pub pending: i64,
}

pub async fn booking_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<BookingStats>> {
    let period_days = query.period_days.unwrap_or(30);
    let since = Utc::now() - Duration::days(period_days);

    let confirmed = BookingRepository::count_by_status_since(&state.pool, BookingStatus::Confirmed, since).await?;
    let cancelled = BookingRepository::count_by_status_since(&state.pool, BookingStatus::Cancelled, since).await?;
    let expired = BookingRepository::count_by_status_since(&state.pool, BookingStatus::Expired, since).await?;
    let pending = BookingRepository::count_by_status_since(&state.pool, BookingStatus::Pending, since).await?;

    Ok(Json(BookingStats { period_days, confirmed, cancelled, expired, pending }))
}

#[derive(Debug, Serialize)]
pub struct ExpireResponse {
    pub expired_count: u64,
}

pub async fn trigger_expire_sweep(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<ExpireResponse>> {
    let expired_count = BookingService::expire_pending(&state).await?;
    Ok(Json(ExpireResponse { expired_count }))
}

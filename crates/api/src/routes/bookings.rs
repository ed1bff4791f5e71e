use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use db::BookingAuditLog;
use domain::BookingStatus;
use serde::{Deserialize, Serialize};
use shared::types::{BookingId, EventId};

use crate::{
    auth::AuthUser,
    error::ApiResult,
    services::{booking_service::CreateBookingInput, BookingService},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub event_id: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedBookings {
    pub bookings: Vec<db::Booking>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<crate::services::booking_service::CreateBookingResult>)> {
    let result = BookingService::create(
        &state,
        CreateBookingInput {
            user_id: user.user_id,
            event_id: EventId::new(body.event_id),
            quantity: body.quantity,
            notes: body.notes,
            ip_address: None,
            user_agent: None,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListBookingsQuery>,
) -> ApiResult<Json<PaginatedBookings>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let (bookings, total) =
        db::BookingRepository::list_for_user(&state.pool, user.user_id, query.status, page, page_size).await?;

    Ok(Json(PaginatedBookings { bookings, total, page, page_size }))
}

pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<db::Booking>> {
    let booking = BookingService::get_by_id(&state, id, user.user_id, user.is_admin).await?;
    Ok(Json(booking))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<db::Booking>> {
    let booking = BookingService::confirm(&state, id, if user.is_admin { None } else { Some(user.user_id) }).await?;
    Ok(Json(booking))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
    Json(body): Json<CancelBookingRequest>,
) -> ApiResult<Json<db::Booking>> {
    let booking = BookingService::cancel(
        &state,
        id,
        if user.is_admin { None } else { Some(user.user_id) },
        body.reason,
    )
    .await?;
    Ok(Json(booking))
}

pub async fn get_booking_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> ApiResult<Json<Vec<BookingAuditLog>>> {
    BookingService::get_by_id(&state, id, user.user_id, user.is_admin).await?;
    let audit = db::BookingRepository::list_audit(&state.pool, id).await?;
    Ok(Json(audit))
}

use axum::extract::{Path, Query, State};
use axum::Json;
use db::{AvailabilityRepository, EventAvailability};
use serde::{Deserialize, Serialize};
use shared::types::EventId;
use shared::DomainError;

use crate::{auth::AdminUser, error::ApiResult, state::AppState};

pub async fn get_availability(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> ApiResult<Json<EventAvailability>> {
    let event_id = EventId::new(event_id);
    let row = AvailabilityRepository::find_by_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| DomainError::EventNotFound(event_id.to_string()))?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub is_available: bool,
    pub available: i32,
}

pub async fn check_availability(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<Json<CheckResponse>> {
    let event_id = EventId::new(event_id);
    let row = AvailabilityRepository::find_by_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| DomainError::EventNotFound(event_id.to_string()))?;
    Ok(Json(CheckResponse {
        is_available: row.available >= query.quantity,
        available: row.available,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    pub total_capacity: i32,
}

/// Admin-only: `POST .../capacity?total_capacity=` creates the local row
/// (used outside the normal EventCreated sync path, e.g. backfills).
pub async fn set_initial_capacity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<i64>,
    Query(query): Query<CapacityQuery>,
) -> ApiResult<Json<EventAvailability>> {
    let event_id = EventId::new(event_id);
    let mut tx = state.pool.begin().await?;
    let row =
        AvailabilityRepository::create(&mut tx, event_id, "", query.total_capacity, rust_decimal::Decimal::ZERO).await?;
    tx.commit().await?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCapacityQuery {
    pub new_total_capacity: i32,
}

/// Admin-only: `PUT .../capacity?new_total_capacity=`.
pub async fn update_capacity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<i64>,
    Query(query): Query<UpdateCapacityQuery>,
) -> ApiResult<Json<EventAvailability>> {
    let event_id = EventId::new(event_id);
    let mut tx = state.pool.begin().await?;
    let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, event_id)
        .await?
        .ok_or_else(|| DomainError::EventNotFound(event_id.to_string()))?;
    let updated = AvailabilityRepository::update_total(&mut tx, event_id, row.version, query.new_total_capacity)
        .await?
        .ok_or_else(|| DomainError::Conflict(event_id.to_string()))?;
    tx.commit().await?;
    Ok(Json(updated))
}

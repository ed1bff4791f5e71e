use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, Json};
use db::{WaitlistAuditLog, WaitlistEntry, WaitlistRepository};
use serde::{Deserialize, Serialize};
use shared::types::{EventId, WaitlistEntryId};
use shared::{AppError, DomainError};

use crate::{
    auth::{AdminUser, AuthUser},
    error::ApiResult,
    services::{waitlist_service::EligibilityResult, waitlist_service::JoinWaitlistInput, WaitlistService},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CheckEligibilityQuery {
    pub quantity: i32,
}

pub async fn check_eligibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    Query(query): Query<CheckEligibilityQuery>,
) -> ApiResult<Json<EligibilityResult>> {
    let result = WaitlistService::check_eligibility(&state, user.user_id, EventId::new(event_id), query.quantity).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct JoinWaitlistRequest {
    pub event_id: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

pub async fn join_waitlist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<JoinWaitlistRequest>,
) -> ApiResult<(StatusCode, Json<WaitlistEntry>)> {
    let entry = WaitlistService::join(
        &state,
        JoinWaitlistInput {
            user_id: user.user_id,
            event_id: EventId::new(body.event_id),
            quantity: body.quantity,
            notes: body.notes,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_my_waitlist(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<WaitlistEntry>>> {
    let entries = WaitlistRepository::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(entries))
}

async fn load_owned_entry(state: &AppState, user: &AuthUser, id: WaitlistEntryId) -> Result<WaitlistEntry, crate::error::ApiError> {
    let entry = WaitlistRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| DomainError::WaitlistEntryNotFound(id.to_string()))?;
    if !user.is_admin && entry.user_id != user.user_id {
        return Err(AppError::NotFound(id.to_string()).into());
    }
    Ok(entry)
}

pub async fn get_waitlist_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<WaitlistEntryId>,
) -> ApiResult<Json<WaitlistEntry>> {
    Ok(Json(load_owned_entry(&state, &user, id).await?))
}

pub async fn cancel_waitlist_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<WaitlistEntryId>,
) -> ApiResult<Json<WaitlistEntry>> {
    let entry = WaitlistService::cancel(&state, id, if user.is_admin { None } else { Some(user.user_id) }).await?;
    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub position: i64,
}

pub async fn get_waitlist_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<WaitlistEntryId>,
) -> ApiResult<Json<PositionResponse>> {
    load_owned_entry(&state, &user, id).await?;
    let position = WaitlistService::position(&state, id).await?;
    Ok(Json(PositionResponse { position }))
}

pub async fn get_waitlist_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<WaitlistEntryId>,
) -> ApiResult<Json<Vec<WaitlistAuditLog>>> {
    load_owned_entry(&state, &user, id).await?;
    let audit = WaitlistRepository::list_audit(&state.pool, id).await?;
    Ok(Json(audit))
}

pub async fn admin_list_event_waitlist(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<i64>,
) -> ApiResult<Json<Vec<WaitlistEntry>>> {
    let entries = WaitlistRepository::list_for_event(&state.pool, EventId::new(event_id)).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct NotifyQuery {
    pub available_quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub notified_count: u32,
}

pub async fn admin_notify_waitlist(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<i64>,
    Query(query): Query<NotifyQuery>,
) -> ApiResult<Json<NotifyResponse>> {
    let count = WaitlistService::notify_next(&state, EventId::new(event_id), query.available_quantity).await?;
    Ok(Json(NotifyResponse { notified_count: count }))
}

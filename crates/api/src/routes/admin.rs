//! Admin dashboard API routes.
//!
//! Guest list management behind the shared admin password. Reads are served
//! from the live guest list; writes go straight to the directory and are
//! followed by a refresh.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use domain::models::{Guest, GuestFields, GuestStats};
use domain::services::{build_confirmation_email, ConfirmationEmail, EventDetails, RefreshTrigger};
use shared::validation::is_blank;

use crate::app::AppState;
use crate::error::ApiError;

/// Query parameters for listing guests.
#[derive(Debug, Default, Deserialize)]
pub struct GuestListQuery {
    /// Case-insensitive substring matched against first and last name.
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GuestListResponse {
    pub guests: Vec<Guest>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RefreshResponse {
    pub guest_count: usize,
    /// False once the change stream has dropped and only manual refresh works.
    pub live: bool,
}

/// GET /api/v1/admin/guests
pub async fn list_guests(
    State(state): State<AppState>,
    Query(query): Query<GuestListQuery>,
) -> Json<GuestListResponse> {
    let guests = filter_guests(state.guest_list.snapshot().await, query.search.as_deref());
    Json(GuestListResponse {
        total: guests.len(),
        guests,
    })
}

/// GET /api/v1/admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<GuestStats> {
    let guests = state.guest_list.snapshot().await;
    Json(GuestStats::from_guests(&guests))
}

/// POST /api/v1/admin/guests
pub async fn create_guest(
    State(state): State<AppState>,
    Json(fields): Json<GuestFields>,
) -> Result<(StatusCode, Json<Guest>), ApiError> {
    let has_names = [&fields.first_name, &fields.last_name]
        .iter()
        .all(|name| name.as_deref().is_some_and(|n| !is_blank(n)));
    if !has_names {
        return Err(ApiError::Validation(
            "First and last name are required".to_string(),
        ));
    }

    let guest = state.directory.create_guest(fields).await?;
    info!(guest_id = %guest.id, "Admin created guest");

    refresh_after_write(&state).await;
    Ok((StatusCode::CREATED, Json(guest)))
}

/// PATCH /api/v1/admin/guests/:guest_id
///
/// Any status may be set here, including a reset to Pending.
pub async fn update_guest(
    State(state): State<AppState>,
    Path(guest_id): Path<Uuid>,
    Json(fields): Json<GuestFields>,
) -> Result<Json<Guest>, ApiError> {
    if fields.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    let blank_name = [&fields.first_name, &fields.last_name]
        .iter()
        .any(|name| name.as_deref().is_some_and(is_blank));
    if blank_name {
        return Err(ApiError::Validation("Names cannot be blank".to_string()));
    }

    let guest = state.directory.update_guest(guest_id, fields).await?;
    info!(guest_id = %guest.id, status = guest.rsvp_status.as_str(), "Admin updated guest");

    refresh_after_write(&state).await;
    Ok(Json(guest))
}

/// DELETE /api/v1/admin/guests/:guest_id
pub async fn delete_guest(
    State(state): State<AppState>,
    Path(guest_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.directory.delete_guest(guest_id).await?;
    info!(guest_id = %guest_id, "Admin deleted guest");

    refresh_after_write(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/guests/:guest_id/confirmation
pub async fn confirmation_email(
    State(state): State<AppState>,
    Path(guest_id): Path<Uuid>,
) -> Result<Json<ConfirmationEmail>, ApiError> {
    let guest = match state.guest_list.get(guest_id).await {
        Some(guest) => guest,
        None => state
            .directory
            .list_guests()
            .await?
            .into_iter()
            .find(|g| g.id == guest_id)
            .ok_or_else(|| ApiError::NotFound(format!("Guest {} not found", guest_id)))?,
    };

    let event = EventDetails {
        couple_names: state.config.rsvp.couple_names.clone(),
        location: state.config.rsvp.location.clone(),
    };
    Ok(Json(build_confirmation_email(&guest, &event)))
}

/// POST /api/v1/admin/guests/refresh
pub async fn refresh_guests(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let guest_count = state.guest_list.refresh(RefreshTrigger::Manual).await?;
    Ok(Json(RefreshResponse {
        guest_count,
        live: state.guest_list.is_live(),
    }))
}

async fn refresh_after_write(state: &AppState) {
    if let Err(e) = state.guest_list.refresh(RefreshTrigger::Manual).await {
        warn!(error = %e, "Guest list refresh after admin write failed");
    }
}

fn filter_guests(guests: Vec<Guest>, search: Option<&str>) -> Vec<Guest> {
    let needle = match search.map(|s| s.trim().to_lowercase()) {
        Some(needle) if !needle.is_empty() => needle,
        _ => return guests,
    };

    guests
        .into_iter()
        .filter(|g| {
            g.first_name.to_lowercase().contains(&needle)
                || g.last_name.to_lowercase().contains(&needle)
        })
        .collect()
}

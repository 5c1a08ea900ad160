use axum::{
    Json,
    extract::{Query, State},
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_member;
use super::validation::{validate_page, validate_required};
use super::{
    ApiError, ApiResponse, AppState, LogEntryDto, LogListResponse, LogPageResponse,
    NewLogEntryRequest,
};
use crate::models::format_timestamp;
use crate::services::Identity;

/// Session key holding the client's IANA timezone name
pub const TIMEZONE_KEY: &str = "timezone";

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u64,
}

const fn first_page() -> u64 {
    1
}

#[derive(Serialize)]
pub struct CreatedEntryResponse {
    pub datetime: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub threading_mode: String,
    pub uptime_seconds: u64,
}

/// Session timezone, falling back to the configured default.
///
/// A stale or unparseable session value is ignored rather than failing
/// the request.
async fn session_timezone(session: &Session, state: &AppState) -> Tz {
    match session.get::<String>(TIMEZONE_KEY).await {
        Ok(Some(name)) => name.parse().unwrap_or_else(|_| {
            tracing::debug!("Ignoring unknown session timezone {name}");
            state.default_timezone()
        }),
        Ok(None) => state.default_timezone(),
        Err(e) => {
            tracing::warn!("Failed to read session timezone: {e}");
            state.default_timezone()
        }
    }
}

/// GET /logbook?page=n
pub async fn get_page(
    State(state): State<Arc<AppState>>,
    session: Session,
    identity: Identity,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<LogPageResponse>>, ApiError> {
    require_member(&identity)?;
    let page = validate_page(query.page)?;

    let tz = session_timezone(&session, &state).await;
    let total_pages = identity.page_count().await?;
    let entries = identity.get_log_display(page).await?;

    Ok(Json(ApiResponse::success(LogPageResponse {
        page,
        total_pages,
        timezone: tz.name().to_string(),
        entries: entries
            .into_iter()
            .map(|e| LogEntryDto::render(e, tz))
            .collect(),
    })))
}

/// GET /logbook/all
pub async fn get_all(
    State(state): State<Arc<AppState>>,
    session: Session,
    identity: Identity,
) -> Result<Json<ApiResponse<LogListResponse>>, ApiError> {
    require_member(&identity)?;

    let tz = session_timezone(&session, &state).await;
    let entries = identity.get_complete_logs().await?;

    Ok(Json(ApiResponse::success(LogListResponse {
        timezone: tz.name().to_string(),
        entries: entries
            .into_iter()
            .map(|e| LogEntryDto::render(e, tz))
            .collect(),
    })))
}

/// POST /logbook
pub async fn add_entry(
    identity: Identity,
    Json(payload): Json<NewLogEntryRequest>,
) -> Result<Json<ApiResponse<CreatedEntryResponse>>, ApiError> {
    require_member(&identity)?;
    validate_required("start", &payload.start)?;
    validate_required("end", &payload.end)?;

    // Empty optional fields are stored as NULL
    let notes = payload.notes.as_deref().filter(|s| !s.trim().is_empty());
    let car = payload.car.as_deref().filter(|s| !s.trim().is_empty());

    let timestamp = identity
        .add_log_entry(&payload.start, &payload.end, notes, car)
        .await?;

    tracing::info!(user = identity.username(), "Log entry added");

    Ok(Json(ApiResponse::success(CreatedEntryResponse {
        datetime: format_timestamp(timestamp),
    })))
}

/// GET /health
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    state.store().ping().await?;

    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok",
        database: "connected",
        threading_mode: state.store().threading_mode().to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })))
}

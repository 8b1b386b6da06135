// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::SessionUser;
use crate::models::{CalendarEvent, EventInput, UserProfile};
use crate::services::events::{EventController, EventSnapshot};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/tokens", get(get_tokens))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/state", get(event_state))
        .route("/api/events/{id}", put(update_event).delete(delete_event))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user's profile, resolved from the auth server.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<UserProfile>> {
    let auth_user = state
        .identity
        .get_user(&user.access_token)
        .await?
        .ok_or(AppError::InvalidToken)?;

    Ok(Json(UserProfile::from_auth_user(&auth_user)))
}

// ─── Delegated Tokens ────────────────────────────────────────

/// Token status for the current user. The refresh token is never exposed.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokensResponse {
    /// Whether a Google account has been linked
    pub linked: bool,
    pub access_token: Option<String>,
    pub expires_at: Option<String>,
    pub expired: bool,
}

async fn get_tokens(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<TokensResponse>> {
    let tokens = state.token_accessor.load(&user.access_token).await?;

    let response = match tokens {
        Some(tokens) => TokensResponse {
            linked: tokens.is_linked(),
            access_token: tokens.access_token().map(str::to_string),
            expired: tokens.is_expired(chrono::Utc::now()),
            expires_at: tokens.google_token_expires_at,
        },
        None => TokensResponse {
            linked: false,
            access_token: None,
            expires_at: None,
            expired: false,
        },
    };

    Ok(Json(response))
}

// ─── Events ──────────────────────────────────────────────────

/// Event list plus sync status, returned by every events endpoint.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    /// One of idle, fetching, syncing, error
    pub status: String,
    pub events: Vec<CalendarEvent>,
    pub last_error: Option<String>,
}

impl From<EventSnapshot> for EventsResponse {
    fn from(snapshot: EventSnapshot) -> Self {
        Self {
            status: snapshot.status.as_str().to_string(),
            events: snapshot.events,
            last_error: snapshot.last_error,
        }
    }
}

/// The user's controller, armed with their current Google access token.
async fn controller_for(state: &AppState, user: &SessionUser) -> Result<Arc<EventController>> {
    let controller = state.event_controllers.for_user(&user.user_id);
    let tokens = state.token_accessor.load_for_user(&user.user_id).await?;

    controller
        .set_access_token(
            tokens
                .as_ref()
                .and_then(|t| t.access_token())
                .map(str::to_string),
        )
        .await;

    Ok(controller)
}

/// Refresh from the remote calendar and return the result.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<EventsResponse>> {
    let controller = controller_for(&state, &user).await?;
    controller.refresh().await?;

    Ok(Json(controller.snapshot().into()))
}

/// Cached state without fetching. Users with no controller yet get the idle
/// default, and none is created for them.
async fn event_state(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Json<EventsResponse> {
    let snapshot = state
        .event_controllers
        .get(&user.user_id)
        .map(|controller| controller.snapshot())
        .unwrap_or_default();

    Json(snapshot.into())
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(input): Json<EventInput>,
) -> Result<(StatusCode, Json<EventsResponse>)> {
    let time_zone = input.resolve(&state.config.default_time_zone)?;
    let controller = controller_for(&state, &user).await?;

    let created = controller.add_event(&input, time_zone).await?;
    tracing::info!(
        user_id = %user.user_id,
        event_id = created.id.as_deref().unwrap_or(""),
        "Event created"
    );

    Ok((StatusCode::CREATED, Json(controller.snapshot().into())))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(event_id): Path<String>,
    Json(input): Json<EventInput>,
) -> Result<Json<EventsResponse>> {
    let time_zone = input.resolve(&state.config.default_time_zone)?;
    let controller = controller_for(&state, &user).await?;

    controller.update_event(&event_id, &input, time_zone).await?;
    tracing::info!(user_id = %user.user_id, event_id = %event_id, "Event updated");

    Ok(Json(controller.snapshot().into()))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(event_id): Path<String>,
) -> Result<Json<EventsResponse>> {
    let controller = controller_for(&state, &user).await?;

    controller.delete_event(&event_id).await?;
    tracing::info!(user_id = %user.user_id, event_id = %event_id, "Event deleted");

    Ok(Json(controller.snapshot().into()))
}

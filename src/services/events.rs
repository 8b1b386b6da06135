// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user event cache kept in sync with the remote calendar.
//!
//! The remote calendar is the source of truth. Every successful mutation is
//! followed by a full refresh rather than a local merge, so the cached list is
//! always exactly what the last completed fetch returned.

use crate::error::AppError;
use crate::models::{CalendarEvent, EventInput};
use crate::services::calendar::GoogleCalendarClient;
use chrono_tz::Tz;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// What the controller is currently doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    /// Fetching the event list
    Fetching,
    /// Sending a create, update or delete
    Syncing,
    /// The last fetch failed
    Error(String),
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error(_) => "error",
        }
    }
}

/// Published state of one controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSnapshot {
    pub status: SyncStatus,
    pub events: Vec<CalendarEvent>,
    pub last_error: Option<String>,
}

/// Owns one user's event list and the access token used to fetch it.
pub struct EventController {
    calendar: GoogleCalendarClient,
    access_token: RwLock<Option<String>>,
    state: watch::Sender<EventSnapshot>,
}

impl EventController {
    pub fn new(calendar: GoogleCalendarClient) -> Self {
        let (state, _) = watch::channel(EventSnapshot::default());
        Self {
            calendar,
            access_token: RwLock::new(None),
            state,
        }
    }

    /// Replace the access token (None or empty clears it).
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token.filter(|t| !t.is_empty());
    }

    pub fn snapshot(&self) -> EventSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EventSnapshot> {
        self.state.subscribe()
    }

    async fn token(&self) -> Result<String, AppError> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or(AppError::Unauthorized)
    }

    /// Fetch the sync window and replace the cached list.
    pub async fn refresh(&self) -> Result<Vec<CalendarEvent>, AppError> {
        let token = self.token().await?;

        self.state.send_modify(|s| s.status = SyncStatus::Fetching);

        match self.calendar.list_events(&token).await {
            Ok(events) => {
                self.state.send_modify(|s| {
                    s.events = events.clone();
                    s.status = SyncStatus::Idle;
                    s.last_error = None;
                });
                Ok(events)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "Event refresh failed");
                self.state.send_modify(|s| {
                    s.status = SyncStatus::Error(message.clone());
                    s.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    pub async fn add_event(&self, input: &EventInput, time_zone: Tz) -> Result<CalendarEvent, AppError> {
        self.mutate("add", |token| async move {
            self.calendar.create_event(&token, input, time_zone).await
        })
        .await
    }

    pub async fn update_event(
        &self,
        event_id: &str,
        input: &EventInput,
        time_zone: Tz,
    ) -> Result<CalendarEvent, AppError> {
        self.mutate("update", |token| async move {
            self.calendar
                .update_event(&token, event_id, input, time_zone)
                .await
        })
        .await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), AppError> {
        self.mutate("delete", |token| async move {
            self.calendar.delete_event(&token, event_id).await
        })
        .await
    }

    /// Run one remote write, then reconcile with a full refresh.
    ///
    /// On failure the cached list is left as it was and the error is both
    /// recorded and returned.
    async fn mutate<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, AppError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self.token().await?;

        self.state.send_modify(|s| s.status = SyncStatus::Syncing);

        let value = match call(token).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, op, "Event mutation failed");
                self.state.send_modify(|s| {
                    s.status = SyncStatus::Idle;
                    s.last_error = Some(e.to_string());
                });
                return Err(e);
            }
        };

        // The write landed; a failed refresh shows up in the published state.
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, op, "Refresh after mutation failed");
        }

        Ok(value)
    }
}

/// One controller per user for the life of the process.
#[derive(Clone)]
pub struct EventControllers {
    calendar: GoogleCalendarClient,
    controllers: Arc<DashMap<String, Arc<EventController>>>,
}

impl EventControllers {
    pub fn new(calendar: GoogleCalendarClient) -> Self {
        Self {
            calendar,
            controllers: Arc::new(DashMap::new()),
        }
    }

    pub fn for_user(&self, user_id: &str) -> Arc<EventController> {
        self.controllers
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(EventController::new(self.calendar.clone())))
            .clone()
    }

    /// The user's controller, if one has been created.
    pub fn get(&self, user_id: &str) -> Option<Arc<EventController>> {
        self.controllers.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

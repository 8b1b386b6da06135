// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar v3 REST client.
//!
//! Handles:
//! - Listing events in the sync window (with pagination)
//! - Creating, patching and deleting single events
//! - Converting remote events into the scheduler's `CalendarEvent`

use crate::error::AppError;
use crate::models::{CalendarEvent, EventInput, EventVariant};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc, sync_window};
use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Largest page the API will return for an event list.
const MAX_RESULTS: u32 = 2500;

const UNTITLED_EVENT: &str = "Untitled Event";

/// Start or end of a remote event.
///
/// Timed events carry `dateTime`; all-day events carry only `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Event resource as returned by the API (only the fields we read).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<GoogleEventTime>,
    #[serde(default)]
    pub end: Option<GoogleEventTime>,
    #[serde(default)]
    pub color_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Body sent on insert and patch.
#[derive(Debug, Serialize)]
pub struct GoogleEventPayload<'a> {
    pub summary: &'a str,
    pub description: &'a str,
    pub start: GoogleEventTime,
    pub end: GoogleEventTime,
    pub location: &'a str,
}

impl<'a> GoogleEventPayload<'a> {
    /// Build the remote body for `input`, expressed in `time_zone`.
    pub fn from_input(input: &'a EventInput, time_zone: Tz) -> Self {
        let (start, end) = if input.all_day {
            let start_date = input.start.with_timezone(&time_zone).date_naive();
            // Google's all-day end date is exclusive and must follow the start
            let end_date = input
                .end
                .with_timezone(&time_zone)
                .date_naive()
                .max(start_date.checked_add_days(Days::new(1)).unwrap_or(start_date));
            (all_day_time(start_date), all_day_time(end_date))
        } else {
            (
                timed_time(input.start, time_zone),
                timed_time(input.end, time_zone),
            )
        };

        Self {
            summary: &input.title,
            description: &input.description,
            start,
            end,
            location: &input.location,
        }
    }
}

fn all_day_time(date: NaiveDate) -> GoogleEventTime {
    GoogleEventTime {
        date: Some(date.format("%Y-%m-%d").to_string()),
        ..Default::default()
    }
}

fn timed_time(instant: DateTime<Utc>, time_zone: Tz) -> GoogleEventTime {
    GoogleEventTime {
        date_time: Some(
            instant
                .with_timezone(&time_zone)
                .to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
        time_zone: Some(time_zone.name().to_string()),
        ..Default::default()
    }
}

/// Instant for a remote start/end: `dateTime` wins, a bare `date` is midnight UTC.
fn event_instant(time: &GoogleEventTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = time.date_time.as_deref() {
        return parse_rfc3339_utc(date_time);
    }

    time.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert a remote event into the scheduler model.
///
/// Returns `None` when the event has no usable start.
pub fn convert_google_event(item: &GoogleEvent) -> Option<CalendarEvent> {
    let start_time = item.start.as_ref()?;
    let start = event_instant(start_time)?;
    let end = item
        .end
        .as_ref()
        .and_then(event_instant)
        .filter(|end| *end >= start)
        .unwrap_or(start);

    Some(CalendarEvent {
        id: item.id.clone(),
        title: item
            .summary
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        description: item.description.clone().unwrap_or_default(),
        start,
        end,
        location: item.location.clone().unwrap_or_default(),
        all_day: start_time.date_time.is_none(),
        variant: EventVariant::from_color_id(item.color_id.as_deref()),
    })
}

/// Google Calendar API client bound to one calendar.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// List events from one month ago to two months ahead.
    pub async fn list_events(&self, access_token: &str) -> Result<Vec<CalendarEvent>, AppError> {
        let (time_min, time_max) = sync_window(Utc::now());
        self.list_events_between(access_token, time_min, time_max)
            .await
    }

    /// List non-cancelled events in `[time_min, time_max)`, following every page.
    pub async fn list_events_between(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        require_token(access_token)?;

        let url = self.events_url();
        let time_min = format_utc_rfc3339(time_min);
        let time_max = format_utc_rfc3339(time_max);
        let mut page_token: Option<String> = None;
        let mut events = Vec::new();

        loop {
            let mut query = vec![
                ("timeMin", time_min.clone()),
                ("timeMax", time_max.clone()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("showDeleted", "false".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await
                .map_err(|e| AppError::CalendarApi(format!("Failed to fetch events: {}", e)))?;

            let page: GoogleEventList = check_response_json(response, "fetch events").await?;

            for item in page
                .items
                .iter()
                .filter(|item| item.status.as_deref() != Some("cancelled"))
            {
                match convert_google_event(item) {
                    Some(event) => events.push(event),
                    None => tracing::warn!(
                        event_id = item.id.as_deref().unwrap_or("<none>"),
                        "Skipping remote event without a usable start"
                    ),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = events.len(), "Fetched calendar events");
        Ok(events)
    }

    /// Insert a new event; returns the remote representation.
    pub async fn create_event(
        &self,
        access_token: &str,
        input: &EventInput,
        time_zone: Tz,
    ) -> Result<CalendarEvent, AppError> {
        require_token(access_token)?;

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&GoogleEventPayload::from_input(input, time_zone))
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Failed to add event: {}", e)))?;

        let created: GoogleEvent = check_response_json(response, "add event").await?;
        convert_google_event(&created)
            .ok_or_else(|| AppError::CalendarApi("Failed to add event: malformed response".to_string()))
    }

    /// Patch an existing event with the input's fields.
    pub async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        input: &EventInput,
        time_zone: Tz,
    ) -> Result<CalendarEvent, AppError> {
        require_token(access_token)?;

        let response = self
            .http
            .patch(self.event_url(event_id))
            .bearer_auth(access_token)
            .json(&GoogleEventPayload::from_input(input, time_zone))
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Failed to update event: {}", e)))?;

        let updated: GoogleEvent = check_response_json(response, "update event").await?;
        convert_google_event(&updated).ok_or_else(|| {
            AppError::CalendarApi("Failed to update event: malformed response".to_string())
        })
    }

    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), AppError> {
        require_token(access_token)?;

        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Failed to delete event: {}", e)))?;

        check_response(response, "delete event").await
    }
}

fn require_token(access_token: &str) -> Result<(), AppError> {
    if access_token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

async fn check_response(response: reqwest::Response, op: &str) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(failure(response, op).await)
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    op: &str,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(failure(response, op).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::CalendarApi(format!("Failed to {}: {}", op, e)))
}

/// `CalendarApi("Failed to <op>: <reason phrase>")` for a non-success response.
async fn failure(response: reqwest::Response, op: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %body, "Calendar API call failed: {}", op);

    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    AppError::CalendarApi(format!("Failed to {}: {}", op, reason))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calendar event model shared by the API and the Google Calendar client.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Display style of an event, bucketed from Google's color classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum EventVariant {
    #[default]
    Primary,
    Success,
    Warning,
    Danger,
}

impl EventVariant {
    /// Map a Google `colorId` to a variant.
    ///
    /// Absent or empty ids are `Primary`; anything that is not a number lands
    /// in `Danger` along with ids above 9.
    pub fn from_color_id(color_id: Option<&str>) -> Self {
        let Some(raw) = color_id.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Primary;
        };

        match raw.parse::<i64>() {
            Ok(id) if id <= 4 => Self::Primary,
            Ok(id) if id <= 7 => Self::Success,
            Ok(id) if id <= 9 => Self::Warning,
            _ => Self::Danger,
        }
    }
}

/// An event as shown in the scheduler.
///
/// The remote calendar owns the authoritative copy; this is a cache that is
/// replaced wholesale after every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/", rename_all = "camelCase")
)]
pub struct CalendarEvent {
    /// Remote event ID (None until the event has been synced)
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(rename = "startDate")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end: DateTime<Utc>,
    pub location: String,
    pub all_day: bool,
    pub variant: EventVariant,
}

/// Caller-supplied fields for creating or updating an event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[validate(length(min = 1, max = 1024))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 8192))]
    pub description: String,
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub location: String,
    #[serde(default)]
    pub all_day: bool,
    /// IANA zone of the caller (e.g. "America/Los_Angeles")
    #[serde(default)]
    #[validate(length(max = 64))]
    pub time_zone: Option<String>,
}

impl EventInput {
    /// Validate the input and resolve the time zone it should be sent in.
    pub fn resolve(&self, default_time_zone: &str) -> Result<Tz, AppError> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if self.start > self.end {
            return Err(AppError::BadRequest(
                "startDate must not be after endDate".to_string(),
            ));
        }

        let zone = self
            .time_zone
            .as_deref()
            .filter(|z| !z.is_empty())
            .unwrap_or(default_time_zone);

        zone.parse::<Tz>()
            .map_err(|_| AppError::BadRequest(format!("Unknown time zone: {}", zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_variant_buckets() {
        assert_eq!(EventVariant::from_color_id(Some("0")), EventVariant::Primary);
        assert_eq!(EventVariant::from_color_id(Some("4")), EventVariant::Primary);
        assert_eq!(EventVariant::from_color_id(Some("5")), EventVariant::Success);
        assert_eq!(EventVariant::from_color_id(Some("7")), EventVariant::Success);
        assert_eq!(EventVariant::from_color_id(Some("8")), EventVariant::Warning);
        assert_eq!(EventVariant::from_color_id(Some("9")), EventVariant::Warning);
        assert_eq!(EventVariant::from_color_id(Some("10")), EventVariant::Danger);
        assert_eq!(EventVariant::from_color_id(Some("11")), EventVariant::Danger);
    }

    #[test]
    fn test_variant_missing_or_garbage() {
        assert_eq!(EventVariant::from_color_id(None), EventVariant::Primary);
        assert_eq!(EventVariant::from_color_id(Some("")), EventVariant::Primary);
        assert_eq!(EventVariant::from_color_id(Some("teal")), EventVariant::Danger);
    }

    fn input(start_hour: u32, end_hour: u32) -> EventInput {
        EventInput {
            title: "Standup".to_string(),
            description: String::new(),
            start: Utc.with_ymd_and_hms(2026, 6, 1, start_hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 6, 1, end_hour, 0, 0).unwrap(),
            location: String::new(),
            all_day: false,
            time_zone: None,
        }
    }

    #[test]
    fn test_resolve_uses_default_zone() {
        let tz = input(9, 10).resolve("Europe/Berlin").unwrap();
        assert_eq!(tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_resolve_rejects_inverted_range() {
        let err = input(10, 9).resolve("UTC").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_resolve_rejects_bad_input() {
        let mut bad_zone = input(9, 10);
        bad_zone.time_zone = Some("Mars/Olympus_Mons".to_string());
        assert!(matches!(
            bad_zone.resolve("UTC"),
            Err(AppError::BadRequest(_))
        ));

        let mut empty_title = input(9, 10);
        empty_title.title.clear();
        assert!(matches!(
            empty_title.resolve("UTC"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_event_serializes_with_ui_field_names() {
        let event = CalendarEvent {
            id: Some("abc".to_string()),
            title: "Lunch".to_string(),
            description: String::new(),
            start: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 6, 1, 13, 0, 0).unwrap(),
            location: "Cafe".to_string(),
            all_day: false,
            variant: EventVariant::Success,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["startDate"], "2026-06-01T12:00:00Z");
        assert_eq!(value["allDay"], false);
        assert_eq!(value["variant"], "success");
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and the calendar sync window.

use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};

/// Lifetime assumed for a provider access token when the session omits one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp (any offset) into UTC.
pub fn parse_rfc3339_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expiry instant for a token captured at `now` with the declared lifetime.
pub fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    now + Duration::seconds(expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
}

/// Events are listed from one month back to two months ahead.
pub fn sync_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let end = now.checked_add_months(Months::new(2)).unwrap_or(now);
    (start, end)
}

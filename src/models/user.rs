// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User profile and delegated-token models.

use crate::services::identity::AuthUser;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc, token_expiry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Google tokens stored on the user's row in the `users` collection.
///
/// Field names match the persisted columns. Only the token fields are ever
/// written, so other data on the same document is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedTokens {
    #[serde(default)]
    pub google_access_token: Option<String>,
    #[serde(default)]
    pub google_refresh_token: Option<String>,
    /// When the access token expires (RFC3339, UTC)
    #[serde(default)]
    pub google_token_expires_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DelegatedTokens {
    /// Build a record for tokens captured at `now`.
    ///
    /// Expiry is `now + expires_in`, falling back to one hour.
    pub fn issue(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            google_access_token: Some(access_token.into()),
            google_refresh_token: Some(refresh_token.into()),
            google_token_expires_at: Some(format_utc_rfc3339(token_expiry(now, expires_in))),
            updated_at: Some(format_utc_rfc3339(now)),
        }
    }

    /// The access token, if one is stored and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.google_access_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.google_token_expires_at
            .as_deref()
            .and_then(parse_rfc3339_utc)
    }

    /// True when there is no usable expiry or it has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|expires_at| expires_at <= now)
    }

    /// Whether a Google account was ever linked to this user.
    pub fn is_linked(&self) -> bool {
        self.google_access_token.is_some() || self.google_refresh_token.is_some()
    }

    /// An access token always comes with a parseable expiry.
    pub fn is_coherent(&self) -> bool {
        self.google_access_token.is_none() || self.expires_at().is_some()
    }
}

/// Free-form user preferences kept in the identity provider's user metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The signed-in user as shown by the UI (avatar, name, provider).
///
/// Resolved per request from the identity provider and handed to whoever
/// needs it; nothing here is cached across requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/", rename_all = "camelCase")
)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub full_name: Option<String>,
    pub provider: Option<String>,
    pub last_sign_in: Option<String>,
    #[cfg_attr(
        feature = "binding-generation",
        ts(type = "Record<string, unknown> | null")
    )]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub preferences: Option<UserPreferences>,
}

impl UserProfile {
    pub fn from_auth_user(user: &AuthUser) -> Self {
        let meta_str = |key: &str| {
            user.user_metadata
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let preferences = user
            .user_metadata
            .get("preferences")
            .and_then(|v| serde_json::from_value::<UserPreferences>(v.clone()).ok());

        Self {
            id: user.id.clone(),
            email: user.email.clone().filter(|e| !e.is_empty()),
            avatar_url: meta_str("avatar_url"),
            full_name: meta_str("full_name"),
            provider: user
                .app_metadata
                .get("provider")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            last_sign_in: user.last_sign_in_at.clone(),
            metadata: if user.user_metadata.is_empty() {
                None
            } else {
                Some(user.user_metadata.clone())
            },
            preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn test_issue_sets_coherent_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let tokens = DelegatedTokens::issue("access", "refresh", Some(1800), now);

        assert_eq!(tokens.access_token(), Some("access"));
        assert_eq!(tokens.expires_at(), Some(now + Duration::seconds(1800)));
        assert!(tokens.is_coherent());
        assert!(tokens.is_linked());
        assert!(!tokens.is_expired(now));
        assert!(tokens.is_expired(now + Duration::seconds(1800)));
    }

    #[test]
    fn test_incoherent_record_detected() {
        let tokens = DelegatedTokens {
            google_access_token: Some("access".to_string()),
            ..Default::default()
        };
        assert!(!tokens.is_coherent());
        assert!(tokens.is_expired(Utc::now()));
        assert!(!DelegatedTokens::default().is_linked());
    }

    #[test]
    fn test_profile_from_auth_user() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "6f1c0e1a-0000-4000-8000-000000000001",
            "email": "ada@example.com",
            "app_metadata": { "provider": "google" },
            "user_metadata": {
                "avatar_url": "https://example.com/ada.png",
                "full_name": "Ada Lovelace",
                "preferences": { "theme": "dark", "timezone": "Europe/London", "density": "compact" }
            },
            "last_sign_in_at": "2026-05-01T09:00:00Z"
        }))
        .unwrap();

        let profile = UserProfile::from_auth_user(&user);

        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/ada.png"));
        assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.provider.as_deref(), Some("google"));
        let prefs = profile.preferences.unwrap();
        assert_eq!(prefs.theme.as_deref(), Some("dark"));
        assert_eq!(prefs.extra.get("density"), Some(&json!("compact")));
    }

    #[test]
    fn test_profile_without_metadata() {
        let user: AuthUser = serde_json::from_value(json!({ "id": "u1" })).unwrap();
        let profile = UserProfile::from_auth_user(&user);

        assert_eq!(profile.id, "u1");
        assert!(profile.avatar_url.is_none());
        assert!(profile.metadata.is_none());
        assert!(profile.preferences.is_none());
    }
}

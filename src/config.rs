// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup; secrets are kept in memory for the process lifetime.

use std::env;

pub const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_GOOGLE_SCOPES: &str = "https://www.googleapis.com/auth/calendar.events";

/// Backend used for the delegated token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    Firestore,
    Memory,
}

impl std::str::FromStr for TokenStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("TOKEN_STORE", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Base URL of the GoTrue-compatible auth server
    pub auth_url: String,
    /// Public origin of this app, used to build redirect targets
    pub site_url: String,
    /// Google Calendar REST base URL
    pub calendar_api_url: String,
    /// Calendar to operate on
    pub calendar_id: String,
    /// Space-separated OAuth scopes requested from Google
    pub google_scopes: String,
    /// IANA zone used when the caller does not send one
    pub default_time_zone: String,
    /// Token record backend
    pub token_store: TokenStoreKind,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Anonymous API key sent to the auth server
    pub auth_anon_key: String,
    /// HS256 secret the auth server signs session JWTs with (raw bytes)
    pub auth_jwt_secret: Vec<u8>,
    /// HMAC key for the PKCE verifier cookie (raw bytes)
    pub session_cookie_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            auth_url: "http://localhost:9999".to_string(),
            site_url: "http://localhost:3000".to_string(),
            calendar_api_url: DEFAULT_CALENDAR_API_URL.to_string(),
            calendar_id: "primary".to_string(),
            google_scopes: DEFAULT_GOOGLE_SCOPES.to_string(),
            default_time_zone: "UTC".to_string(),
            token_store: TokenStoreKind::Memory,
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            auth_anon_key: "test_anon_key".to_string(),
            auth_jwt_secret: b"test_jwt_secret_32_bytes_minimum!".to_vec(),
            session_cookie_key: b"test_cookie_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let default_time_zone = env::var("DEFAULT_TIME_ZONE").unwrap_or_else(|_| "UTC".to_string());
        if default_time_zone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Invalid("DEFAULT_TIME_ZONE", default_time_zone));
        }

        Ok(Self {
            auth_url: required("AUTH_URL")?.trim_end_matches('/').to_string(),
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            calendar_api_url: env::var("CALENDAR_API_URL")
                .unwrap_or_else(|_| DEFAULT_CALENDAR_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            calendar_id: env::var("CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
            google_scopes: env::var("GOOGLE_SCOPES")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_SCOPES.to_string()),
            default_time_zone,
            token_store: env::var("TOKEN_STORE")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            auth_anon_key: required("AUTH_ANON_KEY")?,
            auth_jwt_secret: required("AUTH_JWT_SECRET")?.into_bytes(),
            session_cookie_key: required("SESSION_COOKIE_KEY")?.into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

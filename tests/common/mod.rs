// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use calendar_assistant::config::Config;
use calendar_assistant::db::{FirestoreDb, MemoryTokenStore};
use calendar_assistant::middleware::auth::create_session_jwt;
use calendar_assistant::routes::create_router;
use calendar_assistant::services::AuthClient;
use calendar_assistant::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test config pointing the auth server and calendar API at mock servers.
#[allow(dead_code)]
pub fn test_config(auth_url: &str, calendar_url: &str) -> Config {
    let mut config = Config::test_default();
    config.auth_url = auth_url.to_string();
    config.calendar_api_url = calendar_url.to_string();
    config
}

/// Create a test app backed by an in-memory token store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app(
    auth_url: &str,
    calendar_url: &str,
) -> (axum::Router, Arc<AppState>, MemoryTokenStore) {
    let config = test_config(auth_url, calendar_url);
    let store = MemoryTokenStore::new();
    let identity = Arc::new(AuthClient::new(&config.auth_url, &config.auth_anon_key));

    let state = Arc::new(AppState::new(config, Arc::new(store.clone()), identity));

    (create_router(state.clone()), state, store)
}

/// Session JWT signed with the test config's secret.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    create_session_jwt(
        user_id,
        Some("test@example.com"),
        &Config::test_default().auth_jwt_secret,
        3600,
    )
    .unwrap()
}

/// `Location` header of a redirect response.
#[allow(dead_code)]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

/// All `Set-Cookie` values of a response.
#[allow(dead_code)]
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use calendar_assistant::error::AppError;

async fn status_and_body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_calendar_error_passes_message_through() {
    let (status, body) = status_and_body(AppError::CalendarApi(
        "Failed to update event: Forbidden".to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "calendar_error");
    assert_eq!(body["details"], "Failed to update event: Forbidden");
}

#[tokio::test]
async fn test_not_found_names_the_path() {
    let (status, body) = status_and_body(AppError::NotFound("/api/missing".to_string())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["details"], "/api/missing");
    assert!(!AppError::NotFound(String::new()).requires_reauth());
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (status, body) =
        status_and_body(AppError::Database("connection reset by peer".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = status_and_body(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_auth_errors_are_unauthorized() {
    for err in [
        AppError::Unauthorized,
        AppError::InvalidToken,
        AppError::ProviderAuth("bad code".to_string()),
    ] {
        let (status, _) = status_and_body(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = status_and_body(AppError::MissingParameter("code")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "code");
}

#[test]
fn test_requires_reauth() {
    assert!(AppError::Unauthorized.requires_reauth());
    assert!(AppError::InvalidToken.requires_reauth());
    assert!(!AppError::CalendarApi("Failed to fetch events: Not Found".to_string()).requires_reauth());
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email link verification flow against a mock auth server.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{create_test_app, location, set_cookies};

fn confirm(query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/auth/confirm{}", query))
        .body(Body::empty())
        .unwrap()
}

async fn mock_verify(server: &MockServer, otp_type: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "confirmed-session",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "user-2", "email": "grace@example.com" }
        }))
    } else {
        ResponseTemplate::new(status)
            .set_body_json(json!({ "code": status, "msg": "Email link is invalid or has expired" }))
    };

    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_partial_json(json!({ "type": otp_type, "token_hash": "hash-123" })))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_parameters_redirect_to_error_page() {
    let auth = MockServer::start().await;
    let (app, _, _) = create_test_app(&auth.uri(), "http://127.0.0.1:9");

    for query in ["", "?type=signup", "?token_hash=hash-123", "?token_hash=&type=signup"] {
        let response = app.clone().oneshot(confirm(query)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND, "query {}", query);
        assert_eq!(location(&response), "http://localhost:3000/auth-error");
    }
}

#[tokio::test]
async fn test_unknown_type_redirects_to_error_page() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&auth)
        .await;
    let (app, _, _) = create_test_app(&auth.uri(), "http://127.0.0.1:9");

    let response = app
        .oneshot(confirm("?token_hash=hash-123&type=sms"))
        .await
        .unwrap();
    assert_eq!(location(&response), "http://localhost:3000/auth-error");
}

#[tokio::test]
async fn test_verified_link_redirects_to_next() {
    let auth = MockServer::start().await;
    mock_verify(&auth, "signup", 200).await;
    let (app, _, _) = create_test_app(&auth.uri(), "http://127.0.0.1:9");

    let response = app
        .clone()
        .oneshot(confirm("?token_hash=hash-123&type=signup&next=%2Fwelcome"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/welcome");
    assert!(set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("cal_session=confirmed-session")));

    let response = app
        .oneshot(confirm("?token_hash=hash-123&type=signup"))
        .await
        .unwrap();
    assert_eq!(location(&response), "http://localhost:3000/");
}

#[tokio::test]
async fn test_rejected_link_redirects_to_error_page() {
    let auth = MockServer::start().await;
    mock_verify(&auth, "recovery", 403).await;
    let (app, _, _) = create_test_app(&auth.uri(), "http://127.0.0.1:9");

    let response = app
        .oneshot(confirm("?token_hash=hash-123&type=recovery"))
        .await
        .unwrap();
    assert_eq!(location(&response), "http://localhost:3000/auth-error");
}

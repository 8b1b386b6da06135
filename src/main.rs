// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar Assistant API Server
//!
//! Signs users in with Google through the auth server and serves their
//! calendar events to the scheduling UI.

use calendar_assistant::{
    config::{Config, TokenStoreKind},
    db::{FirestoreDb, MemoryTokenStore, TokenStore},
    services::AuthClient,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Calendar Assistant API");

    let token_store: Arc<dyn TokenStore> = match config.token_store {
        TokenStoreKind::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        TokenStoreKind::Memory => {
            tracing::warn!("Using in-memory token store; tokens are lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
    };

    let identity = Arc::new(AuthClient::new(&config.auth_url, &config.auth_anon_key));
    tracing::info!(auth_url = %config.auth_url, "Auth server client initialized");

    let state = Arc::new(AppState::new(config.clone(), token_store, identity));

    let app = calendar_assistant::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("calendar_assistant=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calendar Assistant: backend for a Google Calendar scheduling UI
//!
//! This crate signs users in through a GoTrue-compatible auth server, keeps
//! their delegated Google tokens, and syncs their events with Google Calendar.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::TokenStore;
use services::{EventControllers, GoogleCalendarClient, IdentityProvider, TokenAccessor};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_store: Arc<dyn TokenStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub token_accessor: TokenAccessor,
    pub event_controllers: EventControllers,
}

impl AppState {
    /// Wire the services that are derived from the config and the two seams.
    pub fn new(
        config: Config,
        token_store: Arc<dyn TokenStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let calendar = GoogleCalendarClient::new(&config.calendar_api_url, &config.calendar_id);
        let token_accessor = TokenAccessor::new(identity.clone(), token_store.clone());
        let event_controllers = EventControllers::new(calendar);

        Self {
            config,
            token_store,
            identity,
            token_accessor,
            event_controllers,
        }
    }
}

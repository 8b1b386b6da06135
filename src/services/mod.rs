// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod events;
pub mod identity;
pub mod tokens;

pub use calendar::GoogleCalendarClient;
pub use events::{EventController, EventControllers, EventSnapshot, SyncStatus};
pub use identity::{AuthClient, AuthSession, AuthUser, EmailOtpType, IdentityProvider};
pub use tokens::{persist_provider_tokens, TokenAccessor, TokenHandle, TokenState};

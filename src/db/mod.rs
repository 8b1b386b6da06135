// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence for delegated Google tokens.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryTokenStore;

use crate::error::AppError;
use crate::models::DelegatedTokens;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// User rows (keyed by identity-provider user id)
    pub const USERS: &str = "users";
}

/// Keyed record of a user's Google tokens.
///
/// `upsert_tokens` overwrites only the token fields of the user's record.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<DelegatedTokens>, AppError>;

    async fn upsert_tokens(&self, user_id: &str, tokens: &DelegatedTokens)
        -> Result<(), AppError>;
}

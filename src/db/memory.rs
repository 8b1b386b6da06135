// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process token store for local development and tests.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::DelegatedTokens;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Token store backed by a shared `DashMap`. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    records: Arc<DashMap<String, DelegatedTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<DelegatedTokens>, AppError> {
        Ok(self.records.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_tokens(
        &self,
        user_id: &str,
        tokens: &DelegatedTokens,
    ) -> Result<(), AppError> {
        self.records.insert(user_id.to_string(), tokens.clone());
        Ok(())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Delegated Google token lifecycle.
//!
//! Tokens are captured once at OAuth callback time and read back whenever a
//! calendar call needs them. They are not refreshed here: an expired access
//! token is reported to the caller, who sends the user through sign-in again.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::DelegatedTokens;
use crate::services::identity::{AuthSession, IdentityProvider};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Store the Google tokens carried by a freshly exchanged session.
///
/// Returns `Ok(false)` when the session has no user or is missing either
/// provider token; nothing is written in that case.
pub async fn persist_provider_tokens(
    store: &dyn TokenStore,
    session: &AuthSession,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let Some(user) = session.user.as_ref() else {
        return Ok(false);
    };

    let (Some(access_token), Some(refresh_token)) = (
        session.provider_token.as_deref().filter(|t| !t.is_empty()),
        session
            .provider_refresh_token
            .as_deref()
            .filter(|t| !t.is_empty()),
    ) else {
        tracing::debug!(user_id = %user.id, "Session has no provider tokens, nothing to store");
        return Ok(false);
    };

    let tokens = DelegatedTokens::issue(access_token, refresh_token, session.expires_in, now);
    debug_assert!(tokens.is_coherent());
    store.upsert_tokens(&user.id, &tokens).await?;

    tracing::info!(
        user_id = %user.id,
        expires_at = tokens.google_token_expires_at.as_deref().unwrap_or(""),
        "Stored Google tokens"
    );
    Ok(true)
}

/// Observable result of a single token load.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenState {
    Loading,
    /// `tokens` is `None` when no Google account was ever linked
    Loaded { tokens: Option<DelegatedTokens> },
    Errored {
        message: String,
        requires_reauth: bool,
    },
}

impl TokenState {
    pub fn is_loading(&self) -> bool {
        matches!(self, TokenState::Loading)
    }
}

/// Reads a user's delegated tokens on behalf of a signed-in session.
#[derive(Clone)]
pub struct TokenAccessor {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TokenStore>,
}

impl TokenAccessor {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn TokenStore>) -> Self {
        Self { identity, store }
    }

    /// Resolve the session's user and return their token record.
    ///
    /// Fails with `Unauthorized` if the identity provider does not accept
    /// the session.
    pub async fn load(&self, session_token: &str) -> Result<Option<DelegatedTokens>, AppError> {
        let user = self
            .identity
            .get_user(session_token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.load_for_user(&user.id).await
    }

    /// Token record for an already-resolved user id.
    pub async fn load_for_user(&self, user_id: &str) -> Result<Option<DelegatedTokens>, AppError> {
        self.store.get_tokens(user_id).await
    }

    /// Start a load in the background and return a handle to observe it.
    ///
    /// The load runs once. If the handle is dropped before it finishes, the
    /// result is discarded and subscribers stay in `Loading`.
    pub fn mount(&self, session_token: impl Into<String>) -> TokenHandle {
        let (tx, rx) = watch::channel(TokenState::Loading);
        let mounted = Arc::new(AtomicBool::new(true));

        let accessor = self.clone();
        let still_mounted = mounted.clone();
        let session_token = session_token.into();

        tokio::spawn(async move {
            let result = accessor.load(&session_token).await;

            if !still_mounted.load(Ordering::Acquire) {
                tracing::debug!("Token load finished after unmount, discarding result");
                return;
            }

            let state = match result {
                Ok(tokens) => TokenState::Loaded { tokens },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load delegated tokens");
                    TokenState::Errored {
                        requires_reauth: e.requires_reauth(),
                        message: e.to_string(),
                    }
                }
            };
            let _ = tx.send(state);
        });

        TokenHandle { rx, mounted }
    }
}

/// Handle to a mounted token load.
pub struct TokenHandle {
    rx: watch::Receiver<TokenState>,
    mounted: Arc<AtomicBool>,
}

impl TokenHandle {
    pub fn state(&self) -> TokenState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.rx.clone()
    }

    /// Wait until the load has produced a result.
    pub async fn settled(&mut self) -> TokenState {
        let settled = match self.rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.rx.borrow().clone())
    }
}

impl Drop for TokenHandle {
    fn drop(&mut self) {
        self.mounted.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTokenStore;
    use crate::services::identity::{AuthUser, AuthorizeRequest, EmailOtpType};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use tokio::sync::Notify;

    /// Accepts exactly one session token; optionally blocks until released.
    struct FakeIdentity {
        session_token: &'static str,
        user_id: &'static str,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn exchange_code_for_session(&self, _: &str, _: &str) -> Result<AuthSession, AppError> {
            Err(AppError::ProviderAuth("unused".to_string()))
        }

        async fn verify_otp(&self, _: EmailOtpType, _: &str) -> Result<AuthSession, AppError> {
            Err(AppError::ProviderAuth("unused".to_string()))
        }

        async fn get_user(&self, session_token: &str) -> Result<Option<AuthUser>, AppError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if session_token != self.session_token {
                return Ok(None);
            }
            Ok(Some(
                serde_json::from_value(serde_json::json!({ "id": self.user_id })).unwrap(),
            ))
        }

        async fn sign_out(&self, _: &str) -> Result<(), AppError> {
            Ok(())
        }

        fn authorize_url(&self, _: &AuthorizeRequest<'_>) -> String {
            String::new()
        }
    }

    fn session(provider_token: Option<&str>, refresh: Option<&str>) -> AuthSession {
        serde_json::from_value(serde_json::json!({
            "access_token": "session-jwt",
            "expires_in": 1800,
            "user": { "id": "u1" },
            "provider_token": provider_token,
            "provider_refresh_token": refresh,
        }))
        .unwrap()
    }

    fn accessor(store: &MemoryTokenStore, gate: Option<Arc<Notify>>) -> TokenAccessor {
        TokenAccessor::new(
            Arc::new(FakeIdentity {
                session_token: "good",
                user_id: "u1",
                gate,
            }),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_persist_sets_expiry_from_session() {
        let store = MemoryTokenStore::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let stored = persist_provider_tokens(&store, &session(Some("ya29"), Some("1//r")), now)
            .await
            .unwrap();
        assert!(stored);

        let tokens = store.get_tokens("u1").await.unwrap().unwrap();
        assert_eq!(tokens.access_token(), Some("ya29"));
        assert_eq!(tokens.google_refresh_token.as_deref(), Some("1//r"));
        assert_eq!(tokens.expires_at(), Some(now + Duration::seconds(1800)));
    }

    #[tokio::test]
    async fn test_persist_skips_without_refresh_token() {
        let store = MemoryTokenStore::new();
        let stored = persist_provider_tokens(&store, &session(Some("ya29"), None), Utc::now())
            .await
            .unwrap();
        assert!(!stored);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_session() {
        let store = MemoryTokenStore::new();
        let result = accessor(&store, None).load("bad").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_mount_settles_loaded() {
        let store = MemoryTokenStore::new();
        let tokens = DelegatedTokens::issue("ya29", "1//r", None, Utc::now());
        store.upsert_tokens("u1", &tokens).await.unwrap();

        let mut handle = accessor(&store, None).mount("good");
        assert_eq!(
            handle.settled().await,
            TokenState::Loaded {
                tokens: Some(tokens)
            }
        );
    }

    #[tokio::test]
    async fn test_mount_reports_unauthorized() {
        let store = MemoryTokenStore::new();
        let mut handle = accessor(&store, None).mount("bad");

        match handle.settled().await {
            TokenState::Errored {
                requires_reauth, ..
            } => assert!(requires_reauth),
            other => panic!("expected Errored, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unmounted_handle_discards_late_result() {
        let store = MemoryTokenStore::new();
        let gate = Arc::new(Notify::new());
        let handle = accessor(&store, Some(gate.clone())).mount("good");

        let mut subscriber = handle.subscribe();
        drop(handle);
        gate.notify_one();

        // The task ends without publishing, so the channel closes unchanged
        assert!(subscriber.changed().await.is_err());
        assert!(subscriber.borrow().is_loading());
    }
}

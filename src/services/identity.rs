// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the GoTrue-compatible auth server that fronts Google sign-in.
//!
//! The server owns user identities and sessions. This module only exchanges
//! codes for sessions, verifies email links, and resolves session tokens.

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// A user as reported by the auth server.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

/// Session returned by a successful code exchange or OTP verification.
///
/// `provider_token` and `provider_refresh_token` are Google's own tokens and
/// are only present right after an OAuth exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub provider_token: Option<String>,
    #[serde(default)]
    pub provider_refresh_token: Option<String>,
}

/// Kind of email link being verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailOtpType {
    Signup,
    Invite,
    Magiclink,
    Recovery,
    EmailChange,
    Email,
}

impl FromStr for EmailOtpType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(Self::Signup),
            "invite" => Ok(Self::Invite),
            "magiclink" => Ok(Self::Magiclink),
            "recovery" => Ok(Self::Recovery),
            "email_change" => Ok(Self::EmailChange),
            "email" => Ok(Self::Email),
            other => Err(AppError::BadRequest(format!("Unknown OTP type: {}", other))),
        }
    }
}

/// Parameters for the provider authorize redirect.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest<'a> {
    pub provider: &'a str,
    pub redirect_to: &'a str,
    pub scopes: &'a str,
    pub code_challenge: &'a str,
}

/// Operations the app needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an OAuth authorization code (PKCE) for a session.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AppError>;

    /// Verify a hashed email token.
    async fn verify_otp(
        &self,
        otp_type: EmailOtpType,
        token_hash: &str,
    ) -> Result<AuthSession, AppError>;

    /// Resolve a session token. `Ok(None)` when the token is not accepted.
    async fn get_user(&self, session_token: &str) -> Result<Option<AuthUser>, AppError>;

    async fn sign_out(&self, session_token: &str) -> Result<(), AppError>;

    /// URL the browser is sent to in order to start sign-in.
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> String;
}

/// REST client for a GoTrue server.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Parse a session response, turning any non-success into `ProviderAuth`.
    async fn session_from(response: reqwest::Response) -> Result<AuthSession, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderAuth(format!(
                "HTTP {}: {}",
                status,
                provider_message(&body)
            )));
        }

        response
            .json::<AuthSession>()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Malformed session: {}", e)))
    }
}

/// Pull the human-readable part out of a GoTrue error body.
fn provider_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        msg: Option<String>,
        #[serde(default)]
        error_description: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.error_description).or(b.message))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AppError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "auth_code": auth_code,
                "code_verifier": code_verifier,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Code exchange request failed: {}", e)))?;

        Self::session_from(response).await
    }

    async fn verify_otp(
        &self,
        otp_type: EmailOtpType,
        token_hash: &str,
    ) -> Result<AuthSession, AppError> {
        let response = self
            .http
            .post(self.endpoint("verify"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "type": otp_type,
                "token_hash": token_hash,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Verify request failed: {}", e)))?;

        Self::session_from(response).await
    }

    async fn get_user(&self, session_token: &str) -> Result<Option<AuthUser>, AppError> {
        if session_token.is_empty() {
            return Ok(None);
        }

        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("User lookup failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "User lookup returned HTTP {}: {}",
                status,
                provider_message(&body)
            )));
        }

        let user = response
            .json::<AuthUser>()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Malformed user: {}", e)))?;
        Ok(Some(user))
    }

    async fn sign_out(&self, session_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| AppError::ProviderAuth(format!("Logout request failed: {}", e)))?;

        // An already-expired session is as good as signed out.
        let status = response.status();
        if status.is_success() || status.as_u16() == 401 || status.as_u16() == 404 {
            return Ok(());
        }
        Err(AppError::ProviderAuth(format!("Logout returned HTTP {}", status)))
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> String {
        format!(
            "{}?provider={}&\
             redirect_to={}&\
             scopes={}&\
             code_challenge={}&\
             code_challenge_method=s256&\
             access_type=offline&\
             prompt=consent&\
             include_granted_scopes=true",
            self.endpoint("authorize"),
            urlencoding::encode(request.provider),
            urlencoding::encode(request.redirect_to),
            urlencoding::encode(request.scopes),
            urlencoding::encode(request.code_challenge),
        )
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in routes: Google OAuth via the auth server, email links, sign-out.
//!
//! Redirecting handlers never return an error body. Every failure ends in a
//! redirect to the auth error page.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::Instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::services::identity::{AuthSession, AuthorizeRequest, EmailOtpType};
use crate::services::tokens::persist_provider_tokens;
use crate::time_utils::DEFAULT_TOKEN_LIFETIME_SECS;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed PKCE verifier between start and callback.
pub const PKCE_COOKIE: &str = "cal_pkce";

const CALLBACK_PATH: &str = "/auth/callback";
const AUTH_ERROR_PATH: &str = "/auth-error";
const DEFAULT_CALLBACK_NEXT: &str = "/dashboard";
const DEFAULT_CONFIRM_NEXT: &str = "/";
const PKCE_COOKIE_MINUTES: i64 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route(CALLBACK_PATH, get(auth_callback))
        .route("/auth/confirm", get(email_confirm))
        .route("/auth/logout", post(logout))
        .route(AUTH_ERROR_PATH, get(auth_error))
}

/// 302 to `location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn error_redirect(state: &AppState) -> Response {
    found(format!("{}{}", state.config.site_url, AUTH_ERROR_PATH))
}

/// Keep `next` only if it is a same-origin path.
pub fn safe_next(next: Option<&str>, default: &str) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        Some(path) => {
            tracing::warn!(next = %path, "Ignoring off-site redirect target");
            default.to_string()
        }
        None => default.to_string(),
    }
}

/// Random PKCE code verifier (43 URL-safe characters).
pub fn generate_code_verifier() -> Result<String> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn verifier_mac(verifier: &str, key: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(verifier.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Cookie value: `verifier.hexmac`.
pub fn sign_verifier(verifier: &str, key: &[u8]) -> Result<String> {
    Ok(format!("{}.{}", verifier, verifier_mac(verifier, key)?))
}

/// Return the verifier if the cookie value carries a valid signature.
pub fn verify_signed_verifier(value: &str, key: &[u8]) -> Option<String> {
    let (verifier, signature) = value.rsplit_once('.')?;
    if verifier.is_empty() {
        return None;
    }

    let expected = verifier_mac(verifier, key).ok()?;
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        tracing::error!("PKCE cookie signature mismatch");
        return None;
    }

    Some(verifier.to_string())
}

/// Short id to correlate the log lines of one sign-in attempt.
fn request_id() -> String {
    let mut bytes = [0u8; 8];
    match SystemRandom::new().fill(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(_) => "unknown".to_string(),
    }
}

fn session_cookie(state: &AppState, session: &AuthSession) -> Cookie<'static> {
    let lifetime = session
        .expires_in
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    Cookie::build((SESSION_COOKIE, session.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .max_age(time::Duration::seconds(lifetime))
        .build()
}

fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build(name).path(path).build()
}

#[derive(Deserialize)]
pub struct AuthStartParams {
    #[serde(default)]
    next: Option<String>,
}

/// Start Google sign-in through the auth server.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let verifier = generate_code_verifier()?;
    let challenge = code_challenge(&verifier);

    let mut redirect_to = format!("{}{}", state.config.site_url, CALLBACK_PATH);
    if let Some(next) = params.next.as_deref() {
        let next = safe_next(Some(next), DEFAULT_CALLBACK_NEXT);
        redirect_to = format!("{}?next={}", redirect_to, urlencoding::encode(&next));
    }

    let pkce = Cookie::build((
        PKCE_COOKIE,
        sign_verifier(&verifier, &state.config.session_cookie_key)?,
    ))
    .path(CALLBACK_PATH)
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(state.config.secure_cookies())
    .max_age(time::Duration::minutes(PKCE_COOKIE_MINUTES))
    .build();

    let url = state.identity.authorize_url(&AuthorizeRequest {
        provider: "google",
        redirect_to: &redirect_to,
        scopes: &state.config.google_scopes,
        code_challenge: &challenge,
    });

    tracing::info!(redirect_to = %redirect_to, "Starting OAuth flow, redirecting to auth server");

    Ok((jar.add(pkce), Redirect::temporary(&url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    next: Option<String>,
}

/// OAuth callback: exchange the code, store Google tokens, start the session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let span = tracing::info_span!("auth_callback", request_id = %request_id());

    async move {
        let jar_without_pkce = jar.clone().remove(removal(PKCE_COOKIE, CALLBACK_PATH));

        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            tracing::warn!(error = %AppError::MissingParameter("code"), "OAuth callback rejected");
            return (jar_without_pkce, error_redirect(&state)).into_response();
        };

        let verifier = jar
            .get(PKCE_COOKIE)
            .and_then(|c| verify_signed_verifier(c.value(), &state.config.session_cookie_key));
        let Some(verifier) = verifier else {
            tracing::warn!("OAuth callback without a valid PKCE verifier");
            return (jar_without_pkce, error_redirect(&state)).into_response();
        };

        let session = match state
            .identity
            .exchange_code_for_session(code, &verifier)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Code exchange failed");
                return (jar_without_pkce, error_redirect(&state)).into_response();
            }
        };

        // Sign-in still succeeds if the tokens cannot be saved
        if let Err(e) =
            persist_provider_tokens(state.token_store.as_ref(), &session, chrono::Utc::now()).await
        {
            tracing::warn!(error = %e, "Failed to store Google tokens");
        }

        let next = safe_next(params.next.as_deref(), DEFAULT_CALLBACK_NEXT);
        tracing::info!(
            user_id = session.user.as_ref().map(|u| u.id.as_str()).unwrap_or(""),
            next = %next,
            "OAuth sign-in complete"
        );

        let jar = jar_without_pkce.add(session_cookie(&state, &session));
        (jar, found(format!("{}{}", state.config.site_url, next))).into_response()
    }
    .instrument(span)
    .await
}

#[derive(Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    token_hash: Option<String>,
    #[serde(default, rename = "type")]
    otp_type: Option<String>,
    #[serde(default)]
    next: Option<String>,
}

/// Email link landing: verify the token hash and sign the user in.
async fn email_confirm(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConfirmParams>,
    jar: CookieJar,
) -> Response {
    let span = tracing::info_span!("email_confirm", request_id = %request_id());

    async move {
        let (Some(token_hash), Some(otp_type)) = (
            params.token_hash.as_deref().filter(|t| !t.is_empty()),
            params.otp_type.as_deref(),
        ) else {
            let missing = if params.otp_type.is_some() { "token_hash" } else { "type" };
            tracing::warn!(error = %AppError::MissingParameter(missing), "Email confirmation rejected");
            return error_redirect(&state);
        };

        let otp_type = match otp_type.parse::<EmailOtpType>() {
            Ok(otp_type) => otp_type,
            Err(e) => {
                tracing::warn!(error = %e, "Email confirmation with unknown type");
                return error_redirect(&state);
            }
        };

        match state.identity.verify_otp(otp_type, token_hash).await {
            Ok(session) => {
                let next = safe_next(params.next.as_deref(), DEFAULT_CONFIRM_NEXT);
                tracing::info!(next = %next, "Email confirmed");
                let jar = jar.add(session_cookie(&state, &session));
                (jar, found(format!("{}{}", state.config.site_url, next))).into_response()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Email verification failed");
                error_redirect(&state)
            }
        }
    }
    .instrument(span)
    .await
}

/// Sign out: revoke the session upstream (best effort) and clear cookies.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(session) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.identity.sign_out(session.value()).await {
            tracing::warn!(error = %e, "Auth server sign-out failed");
        }
    }

    let jar = jar
        .remove(removal(SESSION_COOKIE, "/"))
        .remove(removal(PKCE_COOKIE, CALLBACK_PATH));
    (jar, StatusCode::NO_CONTENT)
}

async fn auth_error() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
<h1>Authentication Error</h1>
<p>There was a problem signing you in. Please try again.</p>
<p><a href="/">Return home</a></p>
</body>
</html>
"#,
    )
}

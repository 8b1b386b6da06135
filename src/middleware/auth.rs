// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.
//!
//! Sessions are HS256 JWTs issued by the auth server. They arrive either in
//! the `cal_session` cookie or as a bearer token.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie holding the auth server session token.
pub const SESSION_COOKIE: &str = "cal_session";

/// Audience the auth server puts on user sessions.
pub const SESSION_AUDIENCE: &str = "authenticated";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (auth server user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
}

/// Signed-in user, inserted as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub email: Option<String>,
    /// Raw session token, for calls back to the auth server
    pub access_token: String,
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or(AppError::Unauthorized)?,
    };

    let claims = verify_session(&token, &state.config.auth_jwt_secret)?;

    request.extensions_mut().insert(SessionUser {
        user_id: claims.sub,
        email: claims.email,
        access_token: token,
    });

    Ok(next.run(request).await)
}

/// Check signature, expiry and audience of a session token.
pub fn verify_session(token: &str, secret: &[u8]) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SESSION_AUDIENCE]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::InvalidToken
        },
    )?;

    if data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(data.claims)
}

/// Mint a session token the way the auth server does.
pub fn create_session_jwt(
    user_id: &str,
    email: Option<&str>,
    secret: &[u8],
    lifetime_secs: usize,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + lifetime_secs,
        email: email.map(str::to_string),
        role: Some(SESSION_AUDIENCE.to_string()),
        aud: SESSION_AUDIENCE.to_string(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit_test_secret_that_is_long_enough";

    #[test]
    fn test_round_trip_claims() {
        let token = create_session_jwt("u1", Some("a@example.com"), SECRET, 3600).unwrap();
        let claims = verify_session(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_session_jwt("u1", None, SECRET, 3600).unwrap();
        assert!(matches!(
            verify_session(&token, b"some_other_secret_of_similar_size!!"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = Claims {
            sub: "u1".to_string(),
            exp: 4_000_000_000,
            iat: 0,
            email: None,
            role: Some("anon".to_string()),
            aud: "anon".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(verify_session(&token, SECRET).is_err());
    }
}

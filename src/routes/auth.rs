// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::sessions::{OAUTH_NONCE_KEY, USER_ID_KEY};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a login redirect stays valid.
const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/discord", get(auth_start))
        .route("/auth/discord/callback", get(auth_callback))
        .route("/auth/logout", get(logout).post(logout))
}

/// Start OAuth flow - redirect to Discord authorization.
async fn auth_start(State(state): State<Arc<AppState>>, session: Session) -> Result<Redirect> {
    let nonce = generate_nonce()?;
    let oauth_state = sign_state(&nonce, Utc::now().timestamp_millis(), &state.config.oauth_state_key)?;

    // The callback must come back to the same browser session.
    session.insert(OAUTH_NONCE_KEY, &nonce).await?;

    tracing::info!(
        client_id = %state.config.discord_client_id,
        "Starting OAuth flow, redirecting to Discord"
    );

    Ok(Redirect::temporary(&state.discord.authorize_url(&oauth_state)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, create session.
///
/// Always answers with a redirect to the frontend; failures are reported
/// through an `error` query parameter.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.as_str();

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Discord");
        return redirect_with_error(frontend_url, &error);
    }

    let Some(code) = params.code else {
        return Redirect::temporary(frontend_url);
    };

    let expected_nonce: Option<String> = match session.remove(OAUTH_NONCE_KEY).await {
        Ok(nonce) => nonce,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read OAuth nonce from session");
            None
        }
    };

    let nonce = params.state.as_deref().and_then(|s| {
        verify_state(
            s,
            &state.config.oauth_state_key,
            Utc::now().timestamp_millis(),
        )
    });

    let state_matches = match (nonce, expected_nonce) {
        (Some(nonce), Some(expected)) => bool::from(nonce.as_bytes().ct_eq(expected.as_bytes())),
        _ => false,
    };
    if !state_matches {
        tracing::warn!("Invalid, expired or foreign OAuth state parameter");
        return redirect_with_error(frontend_url, "invalid_state");
    }

    match complete_login(&state, &session, &code).await {
        Ok(user) => {
            tracing::info!(
                user_id = %user.id,
                username = %user.username,
                role = %user.role,
                "Login successful"
            );
            Redirect::temporary(frontend_url)
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            redirect_with_error(frontend_url, "login_failed")
        }
    }
}

/// Exchange the code, upsert the member and bind them to a fresh session ID.
async fn complete_login(state: &AppState, session: &Session, code: &str) -> Result<User> {
    tracing::info!("Exchanging authorization code for tokens");
    let token = state.discord.exchange_code(code).await?;
    let discord_user = state.discord.get_current_user(&token.access_token).await?;

    let initial_role = state.role_resolver.initial_role(&discord_user.id);
    let user = state
        .db
        .upsert_user(&discord_user.into_profile(initial_role), Utc::now())
        .await?;

    session.cycle_id().await?;
    session.insert(USER_ID_KEY, &user.id).await?;

    Ok(user)
}

fn redirect_with_error(frontend_url: &str, error: &str) -> Redirect {
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    Redirect::temporary(&format!(
        "{}{}error={}",
        frontend_url,
        separator,
        urlencoding::encode(error)
    ))
}

fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate OAuth nonce")))?;
    Ok(hex::encode(bytes))
}

/// Sign `nonce` and the issue time into an opaque OAuth `state` value.
///
/// Format before encoding: `nonce|timestamp_hex|signature_hex`.
pub fn sign_state(nonce: &str, issued_at_ms: i64, key: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, issued_at_ms);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify an OAuth `state` value and return its nonce.
///
/// Rejects bad signatures and states older than ten minutes (or issued in
/// the future).
pub fn verify_state(state: &str, key: &[u8], now_ms: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{}|{}", nonce, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = hex::decode(signature_hex).ok()?;
    if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now_ms.checked_sub(issued_at)?;
    if !(0..=STATE_MAX_AGE_MS).contains(&age) {
        tracing::warn!(age_ms = age, "OAuth state expired");
        return None;
    }

    Some(nonce.to_string())
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout - destroy the session and its stored record.
async fn logout(session: Session) -> Result<Json<LogoutResponse>> {
    let user_id: Option<String> = session.get(USER_ID_KEY).await?;
    session.flush().await?;

    if let Some(user_id) = user_id {
        tracing::info!(user_id = %user_id, "User logged out");
    }

    Ok(Json(LogoutResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"secret_key";

    #[test]
    fn test_verify_state_success() {
        let now = 1_700_000_000_000;
        let state = sign_state("abc123", now, KEY).unwrap();
        assert_eq!(verify_state(&state, KEY, now + 1_000), Some("abc123".to_string()));
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let now = 1_700_000_000_000;
        let state = sign_state("abc123", now, KEY).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key", now), None);
    }

    #[test]
    fn test_verify_state_invalid_signature() {
        let payload = format!("abc123|{:x}|{}", 1_700_000_000_000i64, "00".repeat(32));
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        assert_eq!(verify_state(&encoded, KEY, 1_700_000_000_000), None);
    }

    #[test]
    fn test_verify_state_expired_and_future() {
        let issued = 1_700_000_000_000;
        let state = sign_state("abc123", issued, KEY).unwrap();
        assert!(verify_state(&state, KEY, issued + STATE_MAX_AGE_MS).is_some());
        assert_eq!(verify_state(&state, KEY, issued + STATE_MAX_AGE_MS + 1), None);
        assert_eq!(verify_state(&state, KEY, issued - 1), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_state(&encoded, KEY, 0), None);
        assert_eq!(verify_state("not base64!!", KEY, 0), None);
    }

    #[test]
    fn test_redirect_with_error_separator() {
        use axum::response::IntoResponse;

        let location = |r: Redirect| {
            r.into_response()
                .headers()
                .get(axum::http::header::LOCATION)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        };

        assert_eq!(location(redirect_with_error("/", "login_failed")), "/?error=login_failed");
        assert_eq!(
            location(redirect_with_error("https://hub.example/?tab=1", "access denied")),
            "https://hub.example/?tab=1&error=access%20denied"
        );
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord OAuth2 client and first-login role resolution.
//!
//! Handles:
//! - Building the authorize URL for the login redirect
//! - Exchanging an authorization code for an access token
//! - Fetching the authenticated user's identity

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Role, UserProfile};
use serde::Deserialize;

/// Scopes requested at login.
pub const OAUTH_SCOPES: &str = "identify guilds.members.read";

const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
const DISCORD_API_BASE: &str = "https://discord.com/api";
const DISCORD_CDN_BASE: &str = "https://cdn.discordapp.com";

/// Discord API client.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DiscordClient {
    /// Create a new Discord client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DISCORD_API_BASE.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Point API calls at a different host (local fakes and tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.discord_client_id.clone(),
            config.discord_client_secret.clone(),
            config.discord_redirect_uri.clone(),
        )
    }

    /// URL the browser is sent to for consent.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            DISCORD_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", OAUTH_SCOPES),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Get the authenticated user's identity.
    pub async fn get_current_user(&self, access_token: &str) -> Result<DiscordUser, AppError> {
        let response = self
            .http
            .get(format!("{}/users/@me", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Discord rate limit hit (429)");
        }

        return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
}

/// OAuth token response from Discord.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// `GET /users/@me` response (fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    /// Avatar hash
    #[serde(default)]
    pub avatar: Option<String>,
}

impl DiscordUser {
    /// CDN URL of the user's avatar, if one is set.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{}/avatars/{}/{}.png", DISCORD_CDN_BASE, self.id, hash))
    }

    pub fn into_profile(self, initial_role: Role) -> UserProfile {
        let avatar = self.avatar_url();
        UserProfile {
            id: self.id,
            username: self.username,
            avatar,
            initial_role,
        }
    }
}

/// Decides the role a member starts with on first login.
///
/// Guild role sync is not wired up; everyone starts as `Recruta` unless
/// listed in `BOOTSTRAP_ADMIN_IDS`.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    bootstrap_admin_ids: Vec<String>,
}

impl RoleResolver {
    pub fn new(bootstrap_admin_ids: Vec<String>) -> Self {
        Self {
            bootstrap_admin_ids,
        }
    }

    pub fn initial_role(&self, user_id: &str) -> Role {
        if self.bootstrap_admin_ids.iter().any(|id| id == user_id) {
            tracing::info!(user_id, "Granting bootstrap admin role");
            Role::Marechal
        } else {
            Role::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DiscordClient {
        DiscordClient::new(
            "1234".to_string(),
            "secret".to_string(),
            "http://localhost:3000/auth/discord/callback".to_string(),
        )
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let url = client().authorize_url("abc_DEF-1");

        assert!(url.starts_with("https://discord.com/api/oauth2/authorize?"));
        assert!(url.contains("client_id=1234"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fdiscord%2Fcallback"
        ));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=identify%20guilds.members.read"));
        assert!(url.contains("state=abc_DEF-1"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_avatar_url() {
        let user: DiscordUser =
            serde_json::from_str(r#"{"id":"80351110224678912","username":"nelly","avatar":"8342729096ea3675442027381ff50dfe"}"#)
                .unwrap();
        assert_eq!(
            user.avatar_url().as_deref(),
            Some("https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png")
        );

        let no_avatar: DiscordUser =
            serde_json::from_str(r#"{"id":"1","username":"plain","avatar":null}"#).unwrap();
        assert_eq!(no_avatar.avatar_url(), None);
        assert_eq!(no_avatar.into_profile(Role::Recruta).avatar, None);
    }

    #[test]
    fn test_role_resolver() {
        let resolver = RoleResolver::new(vec!["42".to_string()]);
        assert_eq!(resolver.initial_role("42"), Role::Marechal);
        assert_eq!(resolver.initial_role("43"), Role::Recruta);
        assert_eq!(RoleResolver::default().initial_role("42"), Role::Recruta);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Secrets (Discord client
//! secret, session secret) are expected to be injected as environment
//! variables by the deployment.

use hkdf::Hkdf;
use sha2::Sha256;
use std::env;

/// Minimum session secret length accepted in production.
const MIN_SESSION_SECRET_LEN: usize = 32;

/// HKDF info label for the OAuth state signing key.
const OAUTH_STATE_KEY_INFO: &[u8] = b"newgame-hub/oauth-state/v1";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Which document store backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// In-process store; data is lost on restart.
    Memory,
    /// Google Cloud Firestore (or its emulator).
    Firestore,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Discord OAuth client ID (public)
    pub discord_client_id: String,
    /// OAuth callback registered with Discord
    pub discord_redirect_uri: String,
    /// Where the browser lands after login/logout
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub environment: Environment,
    pub database_backend: DatabaseBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: Option<String>,
    /// Webhook used to announce new tasks; announcements are only logged when unset
    pub discord_webhook_url: Option<String>,
    /// Discord user IDs granted `Marechal` on their first login
    pub bootstrap_admin_ids: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,

    // --- Secrets ---
    /// Discord OAuth client secret
    pub discord_client_secret: String,
    /// Key for signing OAuth `state` values, derived from `SESSION_SECRET`
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            discord_client_id: "test_client_id".to_string(),
            discord_redirect_uri: "http://localhost:3000/auth/discord/callback".to_string(),
            frontend_url: "/".to_string(),
            port: 3000,
            environment: Environment::Development,
            database_backend: DatabaseBackend::Memory,
            gcp_project_id: None,
            discord_webhook_url: None,
            bootstrap_admin_ids: Vec::new(),
            rate_limit_per_second: 1,
            rate_limit_burst: 1000,
            discord_client_secret: "test_secret".to_string(),
            oauth_state_key: derive_oauth_state_key(b"test_session_secret_32_bytes_min!"),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let database_backend = match env::var("DATABASE_BACKEND").as_deref() {
            Ok("firestore") => DatabaseBackend::Firestore,
            Ok("memory") | Err(_) => DatabaseBackend::Memory,
            Ok(_) => return Err(ConfigError::Invalid("DATABASE_BACKEND")),
        };

        let gcp_project_id = env::var("GCP_PROJECT_ID").ok();
        if database_backend == DatabaseBackend::Firestore && gcp_project_id.is_none() {
            return Err(ConfigError::Missing("GCP_PROJECT_ID"));
        }

        let session_secret = env::var("SESSION_SECRET")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?;
        if environment == Environment::Production
            && session_secret.len() < MIN_SESSION_SECRET_LEN
        {
            return Err(ConfigError::Invalid("SESSION_SECRET"));
        }

        Ok(Self {
            discord_client_id: env::var("DISCORD_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("DISCORD_CLIENT_ID"))?,
            discord_redirect_uri: env::var("DISCORD_REDIRECT_URI").unwrap_or_else(|_| {
                "http://localhost:3000/auth/discord/callback".to_string()
            }),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "/".to_string()),
            port: parse_or(env::var("PORT").ok(), 3000),
            environment,
            database_backend,
            gcp_project_id,
            discord_webhook_url: env::var("DISCORD_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            bootstrap_admin_ids: parse_id_list(&env::var("BOOTSTRAP_ADMIN_IDS").unwrap_or_default()),
            rate_limit_per_second: parse_or(env::var("RATE_LIMIT_PER_SECOND").ok(), 5),
            rate_limit_burst: parse_or(env::var("RATE_LIMIT_BURST").ok(), 30),

            discord_client_secret: env::var("DISCORD_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("DISCORD_CLIENT_SECRET"))?,
            oauth_state_key: derive_oauth_state_key(session_secret.as_bytes()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Derive the OAuth state HMAC key so the raw session secret is never used directly.
fn derive_oauth_state_key(secret: &[u8]) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut okm = [0u8; 32];
    hk.expand(OAUTH_STATE_KEY_INFO, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm.to_vec()
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! NewGamE Hub: community points backend
//!
//! Members log in with Discord, redeem time-limited codes for points and
//! climb the leaderboard; the high command creates codes and assigns ranks.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod sessions;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{DiscordClient, Notifier, RoleResolver};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub discord: DiscordClient,
    pub role_resolver: RoleResolver,
    pub notifier: Notifier,
}

impl AppState {
    /// Wire the external collaborators described by `config` around `db`.
    pub fn new(config: Config, db: Arc<dyn Store>) -> Self {
        Self {
            discord: DiscordClient::from_config(&config),
            role_resolver: RoleResolver::new(config.bootstrap_admin_ids.clone()),
            notifier: Notifier::new(config.discord_webhook_url.clone()),
            config,
            db,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - external collaborators.

pub mod discord;
pub mod notifier;

pub use discord::{DiscordClient, DiscordUser, RoleResolver};
pub use notifier::Notifier;

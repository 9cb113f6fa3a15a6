// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User model and authorization tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Authorization tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Role {
    Marechal,
    General,
    #[serde(rename = "Capitão")]
    Capitao,
    #[default]
    Recruta,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Marechal, Role::General, Role::Capitao, Role::Recruta];

    /// Display name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Marechal => "Marechal",
            Role::General => "General",
            Role::Capitao => "Capitão",
            Role::Recruta => "Recruta",
        }
    }

    /// High command: may create tasks and assign roles.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Marechal | Role::General)
    }

    /// High command plus captains.
    pub fn is_moderator(&self) -> bool {
        self.is_admin() || matches!(self, Role::Capitao)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Member profile stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Discord user ID (also used as document ID)
    pub id: String,
    pub username: String,
    /// Avatar URL (None when the Discord account has no avatar)
    pub avatar: Option<String>,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub role: Role,
    /// First login
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// Build a brand new member from a login profile.
    pub fn from_profile(profile: &UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: profile.id.clone(),
            username: profile.username.clone(),
            avatar: profile.avatar.clone(),
            points: 0,
            role: profile.initial_role,
            joined_at: now,
        }
    }

    /// Refresh identity fields from a later login. Points, role and join
    /// date belong to this system and are left alone.
    pub fn refresh_profile(&mut self, profile: &UserProfile) {
        self.username = profile.username.clone();
        self.avatar = profile.avatar.clone();
    }
}

/// Identity data gathered at login.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    /// Role applied only if the user does not exist yet
    pub initial_role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, username: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            username: username.to_string(),
            avatar: None,
            initial_role: Role::Marechal,
        }
    }

    #[test]
    fn test_role_round_trips_through_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        assert!("Capitao".parse::<Role>().is_err());
        assert!("marechal".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_and_moderator_tiers() {
        assert!(Role::Marechal.is_admin());
        assert!(Role::General.is_admin());
        assert!(!Role::Capitao.is_admin());
        assert!(!Role::Recruta.is_admin());

        assert!(Role::Capitao.is_moderator());
        assert!(Role::General.is_moderator());
        assert!(!Role::Recruta.is_moderator());
    }

    #[test]
    fn test_refresh_profile_keeps_points_and_role() {
        let now = Utc::now();
        let mut user = User::from_profile(&profile("1", "old"), now);
        user.points = 40;
        user.role = Role::Capitao;

        let mut later = profile("1", "new");
        later.avatar = Some("https://cdn.example/a.png".to_string());
        later.initial_role = Role::Recruta;
        user.refresh_profile(&later);

        assert_eq!(user.username, "new");
        assert_eq!(user.avatar.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(user.points, 40);
        assert_eq!(user.role, Role::Capitao);
        assert_eq!(user.joined_at, now);
    }
}

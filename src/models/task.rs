// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Redeemable task codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-limited code stored in the `tasks` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Redemption code (also used as document ID)
    pub code: String,
    /// Points awarded per redemption
    pub points: u32,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
    /// User ID of the admin who created the task
    pub created_by: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    /// User IDs that already redeemed this code; never contains duplicates
    #[serde(default)]
    pub redeemed_by: Vec<String>,
}

impl Task {
    /// Codes stay valid up to and including `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn has_redeemed(&self, user_id: &str) -> bool {
        self.redeemed_by.iter().any(|id| id == user_id)
    }

    /// Record a redemption. Returns false if the user was already recorded.
    pub fn record_redemption(&mut self, user_id: &str) -> bool {
        if self.has_redeemed(user_id) {
            return false;
        }
        self.redeemed_by.push(user_id.to_string());
        true
    }
}

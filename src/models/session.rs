// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Persisted HTTP session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session record stored in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDoc {
    /// Session ID as carried by the cookie (also used as document ID)
    pub id: String,
    /// JSON-encoded session data
    pub data: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl SessionDoc {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

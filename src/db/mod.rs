// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the document store seam and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Role, SessionDoc, Task, User, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TASKS: &str = "tasks";
    pub const SESSIONS: &str = "sessions";
}

/// Result of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed {
        points_awarded: u32,
        total_points: u64,
    },
    UnknownCode,
    Expired,
    AlreadyRedeemed,
    UnknownUser,
}

/// Document store operations used by the HTTP layer.
///
/// Every multi-document mutation is atomic within a backend: redemption
/// either awards points and records the redeemer, or changes nothing.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ──────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Create the user on first login, or refresh identity fields of an
    /// existing one. Returns the stored user.
    async fn upsert_user(&self, profile: &UserProfile, now: DateTime<Utc>)
        -> Result<User, AppError>;

    /// Overwrite a user's role. `None` if the user does not exist.
    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<User>, AppError>;

    /// Top `limit` users by points, descending. Ties keep store order.
    async fn leaderboard(&self, limit: u32) -> Result<Vec<User>, AppError>;

    // ─── Tasks ──────────────────────────────────────────────────

    async fn get_task(&self, code: &str) -> Result<Option<Task>, AppError>;

    /// Persist a new task. Fails with `Conflict` if the code is taken.
    async fn create_task(&self, task: &Task) -> Result<(), AppError>;

    /// Tasks that have not expired at `now`, soonest expiry first.
    async fn list_active_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError>;

    /// Award a task's points to a user, at most once per user.
    async fn redeem_task(
        &self,
        code: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError>;

    // ─── Sessions ───────────────────────────────────────────────

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDoc>, AppError>;

    async fn save_session(&self, session: &SessionDoc) -> Result<(), AppError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;

    /// Remove every session record expired at `now`. Returns how many
    /// were removed.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

/// Shared redemption decision, applied by every backend to the documents
/// it read. On success both documents are mutated in place and must be
/// written back together.
pub(crate) fn apply_redemption(
    task: Option<&mut Task>,
    user: Option<&mut User>,
    user_id: &str,
    now: DateTime<Utc>,
) -> RedeemOutcome {
    let Some(task) = task else {
        return RedeemOutcome::UnknownCode;
    };
    if task.is_expired(now) {
        return RedeemOutcome::Expired;
    }
    let Some(user) = user else {
        return RedeemOutcome::UnknownUser;
    };
    if !task.record_redemption(user_id) {
        return RedeemOutcome::AlreadyRedeemed;
    }

    user.points = user.points.saturating_add(u64::from(task.points));
    RedeemOutcome::Redeemed {
        points_awarded: task.points,
        total_points: user.points,
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.
//!
//! Users and tasks share one mutex so a redemption reads and writes both
//! documents atomically. Sessions live in a separate concurrent map.

use crate::db::{apply_redemption, RedeemOutcome, Store};
use crate::error::AppError;
use crate::models::{Role, SessionDoc, Task, User, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Documents {
    /// Insertion order is the natural store order.
    users: Vec<User>,
    tasks: HashMap<String, Task>,
}

impl Documents {
    fn user_mut(&mut self, user_id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == user_id)
    }
}

/// Memory-backed [`Store`].
#[derive(Default)]
pub struct MemoryDb {
    docs: Mutex<Documents>,
    sessions: DashMap<String, SessionDoc>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Documents>, AppError> {
        self.docs
            .lock()
            .map_err(|_| AppError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn upsert_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let mut docs = self.lock()?;
        if let Some(existing) = docs.user_mut(&profile.id) {
            existing.refresh_profile(profile);
            return Ok(existing.clone());
        }

        let user = User::from_profile(profile, now);
        docs.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<Option<User>, AppError> {
        let mut docs = self.lock()?;
        Ok(docs.user_mut(user_id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<User>, AppError> {
        let mut users = self.lock()?.users.clone();
        // Stable sort keeps insertion order among equal scores.
        users.sort_by(|a, b| b.points.cmp(&a.points));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn get_task(&self, code: &str) -> Result<Option<Task>, AppError> {
        Ok(self.lock()?.tasks.get(code).cloned())
    }

    async fn create_task(&self, task: &Task) -> Result<(), AppError> {
        let mut docs = self.lock()?;
        if docs.tasks.contains_key(&task.code) {
            return Err(AppError::Conflict(format!(
                "Task code '{}' already exists",
                task.code
            )));
        }
        docs.tasks.insert(task.code.clone(), task.clone());
        Ok(())
    }

    async fn list_active_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError> {
        let mut tasks: Vec<Task> = self
            .lock()?
            .tasks
            .values()
            .filter(|t| !t.is_expired(now))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(tasks)
    }

    async fn redeem_task(
        &self,
        code: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, AppError> {
        let mut guard = self.lock()?;
        let docs = &mut *guard;
        let task = docs.tasks.get_mut(code);
        let user = docs.users.iter_mut().find(|u| u.id == user_id);
        Ok(apply_redemption(task, user, user_id, now))
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDoc>, AppError> {
        Ok(self.sessions.get(session_id).map(|s| s.value().clone()))
    }

    async fn save_session(&self, session: &SessionDoc) -> Result<(), AppError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, doc| !doc.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort announcements to the community's Discord channel.

use crate::models::Task;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Posts announcements to a Discord webhook, or logs them when no webhook
/// is configured. Never fails the caller.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Announce a newly created task. Returns immediately; delivery happens
    /// in the background. The handle, present only when a webhook is
    /// configured, resolves to whether the announcement was delivered.
    pub fn task_created(&self, task: &Task) -> Option<JoinHandle<bool>> {
        let message = task_announcement(task);

        let Some(url) = self.webhook_url.clone() else {
            tracing::info!(
                code = %task.code,
                points = task.points,
                announcement = %message,
                "New task announcement (no webhook configured)"
            );
            return None;
        };

        let http = self.http.clone();
        let code = task.code.clone();
        Some(tokio::spawn(async move {
            let result = http
                .post(&url)
                .json(&WebhookMessage { content: &message })
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(_) => {
                    tracing::debug!(code = %code, "Task announcement delivered");
                    true
                }
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "Failed to deliver task announcement");
                    false
                }
            }
        }))
    }
}

fn task_announcement(task: &Task) -> String {
    let expires_in = (task.expires_at - Utc::now()).num_seconds().max(0);
    format!(
        "🔔 New task! Code: `{}` | Points: {} | Expires in: {}s",
        task.code, task.points, expires_in
    )
}

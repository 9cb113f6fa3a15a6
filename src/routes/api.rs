// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API routes: profile, leaderboard, redemption and administration.
//!
//! Authentication and role checks are applied in routes/mod.rs, per group.

use crate::db::RedeemOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, Task, User};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Number of entries on the public leaderboard.
pub const LEADERBOARD_SIZE: u32 = 10;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

pub fn member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/redeem", post(redeem))
}

pub fn moderator_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/tasks", get(list_tasks))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/create-task", post(create_task))
        .route("/api/assign-role", post(assign_role))
}

/// Unwrap a JSON body, reporting malformed input as a 400.
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ─── User Profile ────────────────────────────────────────────

/// Public view of a member.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub role: Role,
    pub joined_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar: user.avatar,
            points: user.points,
            role: user.role,
            joined_at: format_utc_rfc3339(user.joined_at),
        }
    }
}

/// Get current user profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(auth.user.into())
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: u32,
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub role: Role,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
}

async fn get_leaderboard(State(state): State<Arc<AppState>>) -> Result<Json<LeaderboardResponse>> {
    let users = state.db.leaderboard(LEADERBOARD_SIZE).await?;

    let leaderboard = users
        .into_iter()
        .take(LEADERBOARD_SIZE as usize)
        .zip(1..)
        .map(|(user, rank)| LeaderboardEntry {
            rank,
            id: user.id,
            username: user.username,
            avatar: user.avatar,
            points: user.points,
            role: user.role,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        success: true,
        leaderboard,
    }))
}

// ─── Redemption ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedeemResponse {
    pub success: bool,
    pub points_awarded: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub new_points: u64,
}

/// Redeem a task code for the current user.
async fn redeem(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Json<RedeemResponse>> {
    let request = json_body(payload)?;
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Code is required".to_string()));
    }

    let user_id = auth.user.id.as_str();
    match state.db.redeem_task(code, user_id, Utc::now()).await? {
        RedeemOutcome::Redeemed {
            points_awarded,
            total_points,
        } => {
            tracing::info!(
                user_id,
                code,
                points_awarded,
                total_points,
                "Code redeemed"
            );
            Ok(Json(RedeemResponse {
                success: true,
                points_awarded,
                new_points: total_points,
            }))
        }
        RedeemOutcome::UnknownCode => Err(AppError::NotFound("Invalid code".to_string())),
        RedeemOutcome::Expired => Err(AppError::BadRequest("Code has expired".to_string())),
        RedeemOutcome::AlreadyRedeemed => Err(AppError::Conflict(
            "Code already redeemed".to_string(),
        )),
        // The session outlived its user document.
        RedeemOutcome::UnknownUser => Err(AppError::Unauthorized),
    }
}

// ─── Task Administration ─────────────────────────────────────

fn validate_task_code(code: &str) -> std::result::Result<(), ValidationError> {
    let valid = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ValidationError::new("invalid_task_code"));
    }
    Ok(())
}

#[derive(Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(
        length(min = 3, max = 32, message = "Code must be 3 to 32 characters"),
        custom(
            function = validate_task_code,
            message = "Code may only contain letters, digits, '_' and '-'"
        )
    )]
    pub code: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000, message = "Points must be between 1 and 10000"))]
    pub points: i64,
    /// Seconds until the code expires
    #[serde(default)]
    #[validate(range(
        min = 10,
        max = 604800,
        message = "Time must be between 10 seconds and 7 days"
    ))]
    pub time: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedTask {
    pub code: String,
    pub points: u32,
    pub expires_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: CreatedTask,
}

/// Create a new redeemable code and announce it.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<CreateTaskResponse>> {
    let mut request = json_body(payload)?;
    request.code = request.code.trim().to_string();
    request.validate()?;

    let points = u32::try_from(request.points)
        .map_err(|_| AppError::BadRequest("Points out of range".to_string()))?;

    let now = Utc::now();
    let task = Task {
        code: request.code,
        points,
        expires_at: now + Duration::seconds(request.time),
        created_by: auth.user.id.clone(),
        created_at: now,
        redeemed_by: Vec::new(),
    };

    state.db.create_task(&task).await?;

    tracing::info!(
        code = %task.code,
        points = task.points,
        expires_at = %task.expires_at,
        created_by = %auth.user.id,
        "Task created"
    );
    state.notifier.task_created(&task);

    Ok(Json(CreateTaskResponse {
        success: true,
        message: format!("Task {} created", task.code),
        task: CreatedTask {
            code: task.code,
            points: task.points,
            expires_at: format_utc_rfc3339(task.expires_at),
        },
    }))
}

/// Active task with its redemption count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TaskSummary {
    pub code: String,
    pub points: u32,
    pub expires_at: String,
    pub created_by: String,
    pub redemptions: usize,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TasksResponse {
    pub success: bool,
    pub tasks: Vec<TaskSummary>,
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<TasksResponse>> {
    let tasks = state
        .db
        .list_active_tasks(Utc::now())
        .await?
        .into_iter()
        .map(|task| TaskSummary {
            redemptions: task.redeemed_by.len(),
            expires_at: format_utc_rfc3339(task.expires_at),
            code: task.code,
            points: task.points,
            created_by: task.created_by,
        })
        .collect();

    Ok(Json(TasksResponse {
        success: true,
        tasks,
    }))
}

// ─── Role Administration ─────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AssignRoleResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

/// Set a member's role.
async fn assign_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<AssignRoleRequest>, JsonRejection>,
) -> Result<Json<AssignRoleResponse>> {
    let request = json_body(payload)?;
    let user_id = request.user_id.trim();
    if user_id.is_empty() || request.role.is_empty() {
        return Err(AppError::BadRequest(
            "userId and role are required".to_string(),
        ));
    }

    let role: Role = request
        .role
        .parse()
        .map_err(|e: crate::models::user::UnknownRole| AppError::BadRequest(e.to_string()))?;

    let user = state
        .db
        .set_user_role(user_id, role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    tracing::info!(
        user_id = %user.id,
        role = %role,
        assigned_by = %auth.user.id,
        "Role assigned"
    );

    Ok(Json(AssignRoleResponse {
        success: true,
        message: format!("{} is now {}", user.username, role),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str, points: i64, time: i64) -> CreateTaskRequest {
        CreateTaskRequest {
            code: code.to_string(),
            points,
            time,
        }
    }

    #[test]
    fn test_create_task_validation_bounds() {
        assert!(request("ABC", 1, 10).validate().is_ok());
        assert!(request("a_b-C9", 10000, 604800).validate().is_ok());
        assert!(request(&"X".repeat(32), 5, 60).validate().is_ok());

        assert!(request("AB", 5, 60).validate().is_err());
        assert!(request(&"X".repeat(33), 5, 60).validate().is_err());
        assert!(request("ABC", 0, 60).validate().is_err());
        assert!(request("ABC", 10001, 60).validate().is_err());
        assert!(request("ABC", 5, 9).validate().is_err());
        assert!(request("ABC", 5, 604801).validate().is_err());
    }

    #[test]
    fn test_task_code_charset() {
        assert!(validate_task_code("GAME-night_2").is_ok());
        assert!(validate_task_code("has space").is_err());
        assert!(validate_task_code("emoji🎮").is_err());
        assert!(validate_task_code("semi;colon").is_err());
    }

    #[test]
    fn test_user_response_is_camel_case() {
        let now = Utc::now();
        let user = User {
            id: "1".to_string(),
            username: "one".to_string(),
            avatar: None,
            points: 3,
            role: Role::Capitao,
            joined_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["joinedAt"], format_utc_rfc3339(now));
        assert_eq!(json["role"], "Capitão");
        assert!(json.get("joined_at").is_none());
    }
}

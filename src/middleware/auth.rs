// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication and role gates.

use crate::error::{AppError, Result};
use crate::models::User;
use crate::sessions::USER_ID_KEY;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::sync::Arc;
use tower_sessions::Session;

/// Authenticated user, loaded fresh from the store on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Middleware that requires a logged-in session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user_id: String = session
        .get(USER_ID_KEY)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let Some(user) = state.db.get_user(&user_id).await? else {
        tracing::warn!(user_id = %user_id, "Session references unknown user, clearing it");
        session.flush().await?;
        return Err(AppError::Unauthorized);
    };

    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

/// Middleware that requires one of the admin roles. Must run after
/// [`require_auth`].
pub async fn require_admin(
    Extension(auth): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !auth.user.role.is_admin() {
        tracing::warn!(
            user_id = %auth.user.id,
            role = %auth.user.role,
            path = %request.uri().path(),
            "Blocked admin request"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// Middleware that requires a moderator or admin role. Must run after
/// [`require_auth`].
pub async fn require_moderator(
    Extension(auth): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !auth.user.role.is_moderator() {
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

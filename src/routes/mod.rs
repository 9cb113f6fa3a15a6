// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod auth;

use crate::error::expose_internal_details;
use crate::middleware::auth::{require_admin, require_auth, require_moderator};
use crate::middleware::rate_limit::rate_limit_layer;
use crate::middleware::security::add_security_headers;
use crate::sessions::session_layer;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    // CORS layer - allow requests from the frontend, and localhost outside production
    let frontend_origin = state.config.frontend_url.trim_end_matches('/').to_string();
    let allow_local = !state.config.is_production();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .is_ok_and(|o| is_allowed_origin(o, &frontend_origin, allow_local))
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(api::public_routes());

    // Member routes (any logged-in user)
    let member_routes = api::member_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Layers run bottom-up: authenticate first, then check the role.
    let moderator_routes = api::moderator_routes()
        .route_layer(middleware::from_fn(require_moderator))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = api::admin_routes()
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let rate_limit = rate_limit_layer(
        state.config.rate_limit_per_second,
        state.config.rate_limit_burst,
    )?;

    let mut router = Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(moderator_routes)
        .merge(admin_routes);
    if !state.config.is_production() {
        router = router.layer(middleware::from_fn(expose_internal_details));
    }

    Ok(router
        .layer(session_layer(
            state.db.clone(),
            state.config.is_production(),
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            add_security_headers,
        ))
        .layer(rate_limit)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state))
}

/// Exact origin match against the frontend, or a plain-HTTP loopback host
/// when `allow_local` is set.
fn is_allowed_origin(origin: &str, frontend_origin: &str, allow_local: bool) -> bool {
    if origin == frontend_origin {
        return true;
    }
    if !allow_local {
        return false;
    }

    let Ok(uri) = origin.parse::<axum::http::Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http")
        && matches!(uri.host(), Some("localhost" | "127.0.0.1"))
        && matches!(uri.path(), "" | "/")
        && uri.query().is_none()
}

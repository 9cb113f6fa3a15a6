// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::Utc;
use newgame_hub::config::Config;
use newgame_hub::db::{FirestoreDb, MemoryDb, Store};
use newgame_hub::models::{Role, UserProfile};
use newgame_hub::routes::create_router;
use newgame_hub::sessions::{record_to_doc, SESSION_COOKIE, USER_ID_KEY};
use newgame_hub::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::session::{Id, Record};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Create a test app from an explicit config.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let db: Arc<dyn Store> = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()).unwrap(), state)
}

/// Create a test app from a prepared state.
#[allow(dead_code)]
pub fn create_test_app_from_state(state: AppState) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(state);
    (create_router(state.clone()).unwrap(), state)
}

/// Insert a member with the given role and points.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str, role: Role, points: u64) {
    let profile = UserProfile {
        id: id.to_string(),
        username: format!("member{id}"),
        avatar: None,
        initial_role: role,
    };
    state.db.upsert_user(&profile, Utc::now()).await.unwrap();

    if points > 0 {
        let code = format!("SEED-{id}");
        let now = Utc::now();
        state
            .db
            .create_task(&newgame_hub::models::Task {
                code: code.clone(),
                points: u32::try_from(points).unwrap(),
                expires_at: now + chrono::Duration::minutes(5),
                created_by: "seed".to_string(),
                created_at: now,
                redeemed_by: vec![],
            })
            .await
            .unwrap();
        state.db.redeem_task(&code, id, now).await.unwrap();
    }
}

/// Store a logged-in session for `user_id` and return its `Cookie` header.
#[allow(dead_code)]
pub async fn login_cookie(state: &AppState, user_id: &str) -> String {
    let mut data = HashMap::new();
    data.insert(USER_ID_KEY.to_string(), serde_json::json!(user_id));
    let record = Record {
        id: Id::default(),
        data,
        expiry_date: time::OffsetDateTime::now_utc() + time::Duration::hours(1),
    };

    state
        .db
        .save_session(&record_to_doc(&record).unwrap())
        .await
        .unwrap();

    format!("{}={}", SESSION_COOKIE, record.id)
}

/// The `name=value` part of the session cookie set by a response.
#[allow(dead_code)]
pub fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

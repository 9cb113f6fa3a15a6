// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role gates and the admin/moderator endpoints.

use axum::http::StatusCode;
use newgame_hub::models::Role;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, get, json_body, login_cookie, post_json, seed_user};

fn task_body(code: &str) -> serde_json::Value {
    json!({"code": code, "points": 50, "time": 120})
}

#[tokio::test]
async fn test_create_task_requires_admin_role() {
    let (app, state) = create_test_app();

    for (id, role) in [("300", Role::Recruta), ("301", Role::Capitao)] {
        seed_user(&state, id, role, 0).await;
        let cookie = login_cookie(&state, id).await;

        let response = app
            .clone()
            .oneshot(post_json("/api/create-task", Some(&cookie), task_body("BLOCKED")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {role}");
    }

    assert!(state.db.get_task("BLOCKED").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_task_without_session() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(post_json("/api/create-task", None, task_body("ANON")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_creates_task() {
    let (app, state) = create_test_app();

    for (id, role, code) in [("302", Role::Marechal, "ALPHA"), ("303", Role::General, "BRAVO")] {
        seed_user(&state, id, role, 0).await;
        let cookie = login_cookie(&state, id).await;

        let response = app
            .clone()
            .oneshot(post_json("/api/create-task", Some(&cookie), task_body(code)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["task"]["code"], code);
        assert_eq!(body["task"]["points"], 50);
        assert!(body["task"]["expiresAt"].is_string());

        let task = state.db.get_task(code).await.unwrap().unwrap();
        assert_eq!(task.created_by, id);
        let lifetime = (task.expires_at - task.created_at).num_seconds();
        assert_eq!(lifetime, 120);
    }
}

#[tokio::test]
async fn test_create_task_validation() {
    let (app, state) = create_test_app();
    seed_user(&state, "304", Role::Marechal, 0).await;
    let cookie = login_cookie(&state, "304").await;

    let invalid = [
        json!({"code": "AB", "points": 10, "time": 60}),
        json!({"code": "has space", "points": 10, "time": 60}),
        json!({"code": "VALID", "points": 0, "time": 60}),
        json!({"code": "VALID", "points": 10001, "time": 60}),
        json!({"code": "VALID", "points": 10, "time": 5}),
        json!({"code": "VALID", "points": 10, "time": 604801}),
        json!({"code": "VALID", "points": -3, "time": 60}),
        json!({"code": "VALID", "points": "many", "time": 60}),
        json!({"points": 10, "time": 60}),
    ];

    for body in invalid {
        let response = app
            .clone()
            .oneshot(post_json("/api/create-task", Some(&cookie), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    assert!(state.db.get_task("VALID").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_task_duplicate_code() {
    let (app, state) = create_test_app();
    seed_user(&state, "305", Role::General, 0).await;
    let cookie = login_cookie(&state, "305").await;

    let response = app
        .clone()
        .oneshot(post_json("/api/create-task", Some(&cookie), task_body("TWICE")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/create-task",
            Some(&cookie),
            json!({"code": "TWICE", "points": 999, "time": 60}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let task = state.db.get_task("TWICE").await.unwrap().unwrap();
    assert_eq!(task.points, 50);
}

#[tokio::test]
async fn test_assign_role() {
    let (app, state) = create_test_app();
    seed_user(&state, "306", Role::Marechal, 0).await;
    seed_user(&state, "307", Role::Recruta, 0).await;
    let cookie = login_cookie(&state, "306").await;

    let response = app
        .oneshot(post_json(
            "/api/assign-role",
            Some(&cookie),
            json!({"userId": "307", "role": "Capitão"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "307");
    assert_eq!(body["user"]["role"], "Capitão");

    let user = state.db.get_user("307").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Capitao);
}

#[tokio::test]
async fn test_assign_role_rejections() {
    let (app, state) = create_test_app();
    seed_user(&state, "308", Role::General, 0).await;
    seed_user(&state, "309", Role::Recruta, 0).await;
    let cookie = login_cookie(&state, "308").await;

    let cases = [
        (json!({"userId": "309", "role": "Emperor"}), StatusCode::BAD_REQUEST),
        (json!({"userId": "309"}), StatusCode::BAD_REQUEST),
        (json!({"role": "General"}), StatusCode::BAD_REQUEST),
        (json!({"userId": "nobody", "role": "General"}), StatusCode::NOT_FOUND),
    ];

    for (body, expected) in cases {
        let response = app
            .clone()
            .oneshot(post_json("/api/assign-role", Some(&cookie), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{body}");
    }

    let user = state.db.get_user("309").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Recruta);
}

#[tokio::test]
async fn test_assign_role_forbidden_for_captain() {
    let (app, state) = create_test_app();
    seed_user(&state, "310", Role::Capitao, 0).await;
    let cookie = login_cookie(&state, "310").await;

    let response = app
        .oneshot(post_json(
            "/api/assign-role",
            Some(&cookie),
            json!({"userId": "310", "role": "Marechal"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let user = state.db.get_user("310").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Capitao);
}

#[tokio::test]
async fn test_list_tasks_for_moderators() {
    let (app, state) = create_test_app();
    seed_user(&state, "311", Role::Marechal, 0).await;
    seed_user(&state, "312", Role::Capitao, 0).await;
    seed_user(&state, "313", Role::Recruta, 0).await;

    let admin = login_cookie(&state, "311").await;
    let response = app
        .clone()
        .oneshot(post_json("/api/create-task", Some(&admin), task_body("LISTED")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let member = login_cookie(&state, "313").await;
    let response = app
        .clone()
        .oneshot(post_json("/api/redeem", Some(&member), json!({"code": "LISTED"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/tasks", Some(&member)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let captain = login_cookie(&state, "312").await;
    let response = app.oneshot(get("/api/tasks", Some(&captain))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["code"], "LISTED");
    assert_eq!(tasks[0]["redemptions"], 1);
    assert_eq!(tasks[0]["createdBy"], "311");
}

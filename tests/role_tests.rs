// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role selection and role-guard tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Extension, Router,
};
use quizroom::middleware::AuthUser;
use quizroom::models::Role;
use quizroom::routes::{create_router_with, role_scoped};
use quizroom::AppState;
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, login, memory_db};

fn set_role(token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/users/role")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

// ─── Role Selection ──────────────────────────────────────────

#[tokio::test]
async fn test_select_role() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", None).await;

    let response = app
        .oneshot(set_role(&pair.access_token, r#"{"role":"teacher"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["role"], "teacher");

    let stored = state.db.get_user("ada@example.com").await.unwrap().unwrap();
    assert_eq!(stored.role, Some(Role::Teacher));
}

#[tokio::test]
async fn test_change_role() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", Some(Role::Teacher)).await;

    let response = app
        .oneshot(set_role(&pair.access_token, r#"{"role":"student"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["role"], "student");
}

#[tokio::test]
async fn test_invalid_role_rejected() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", None).await;

    for body in [r#"{"role":"admin"}"#, r#"{"role":"Teacher"}"#, "{}"] {
        let response = app
            .clone()
            .oneshot(set_role(&pair.access_token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let json = body_json(response).await;
        assert_eq!(json["message"], "Invalid role. Must be \"teacher\" or \"student\"");
    }

    let stored = state.db.get_user("ada@example.com").await.unwrap().unwrap();
    assert_eq!(stored.role, None);
}

#[tokio::test]
async fn test_select_role_for_deleted_user_requires_reauth() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", None).await;
    state.db.delete_user("ada@example.com").await.unwrap();

    let response = app
        .oneshot(set_role(&pair.access_token, r#"{"role":"teacher"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["requiresReauth"], true);
}

#[tokio::test]
async fn test_account_removed_mid_request_requires_reauth() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", None).await;
    memory_db(&state).remove_user_before_next_update("ada@example.com");

    let response = app
        .oneshot(set_role(&pair.access_token, r#"{"role":"teacher"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "User not found");
    assert_eq!(body["requiresReauth"], true);
    assert_eq!(memory_db(&state).user_count(), 0);
}

// ─── Role Guard ──────────────────────────────────────────────

async fn whoami(Extension(auth): Extension<AuthUser>) -> String {
    auth.user.email
}

fn app_with_classes(state: Arc<AppState>) -> Router {
    let teacher_routes = Router::new().route("/classes", get(whoami));
    let shared_routes = Router::new().route("/lessons", get(whoami));

    let features = Router::new()
        .merge(role_scoped(teacher_routes, state.clone(), &[Role::Teacher]))
        .merge(role_scoped(
            shared_routes,
            state.clone(),
            &[Role::Teacher, Role::Student],
        ));
    create_router_with(state, features)
}

#[tokio::test]
async fn test_role_guard_admits_permitted_role() {
    let (_, state) = create_test_app();
    let app = app_with_classes(state.clone());
    let pair = login(&state, "teacher@example.com", Some(Role::Teacher)).await;

    let response = app
        .oneshot(get_request("/classes", Some(&pair.access_token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_role_guard_rejects_other_role() {
    let (_, state) = create_test_app();
    let app = app_with_classes(state.clone());
    let pair = login(&state, "student@example.com", Some(Role::Student)).await;

    let response = app
        .clone()
        .oneshot(get_request("/classes", Some(&pair.access_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Insufficient permissions");

    let shared = app
        .oneshot(get_request("/lessons", Some(&pair.access_token)))
        .await
        .unwrap();
    assert_eq!(shared.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_role_guard_rejects_user_without_role() {
    let (_, state) = create_test_app();
    let app = app_with_classes(state.clone());
    let pair = login(&state, "new@example.com", None).await;

    for uri in ["/classes", "/lessons"] {
        let response = app
            .clone()
            .oneshot(get_request(uri, Some(&pair.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_role_guard_requires_authentication() {
    let (_, state) = create_test_app();
    let app = app_with_classes(state);

    let response = app.oneshot(get_request("/classes", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_applies_to_existing_token() {
    let (_, state) = create_test_app();
    let app = app_with_classes(state.clone());
    let pair = login(&state, "ada@example.com", Some(Role::Student)).await;

    let before = app
        .clone()
        .oneshot(get_request("/classes", Some(&pair.access_token)))
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::FORBIDDEN);

    let switched = app
        .clone()
        .oneshot(set_role(&pair.access_token, r#"{"role":"teacher"}"#))
        .await
        .unwrap();
    assert_eq!(switched.status(), StatusCode::OK);

    let after = app
        .oneshot(get_request("/classes", Some(&pair.access_token)))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::OK);
}

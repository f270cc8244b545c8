// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers
//! 4. Logout always succeeds and revokes the refresh token when it can

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use quizroom::models::Role;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, login};

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/users/me")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"school":"Lincoln High"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile_with_valid_token() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", Some(Role::Teacher)).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Ms.","school":"Lincoln High"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Ms.");
    assert_eq!(body["school"], "Lincoln High");
    assert_eq!(body["role"], "teacher");

    let stored = state.db.get_user("ada@example.com").await.unwrap().unwrap();
    assert_eq!(stored.school, "Lincoln High");
}

#[tokio::test]
async fn test_update_profile_rejects_empty_name() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/users/me")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_responses_are_not_cacheable() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
}

// ─── Logout ──────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_without_token_succeeds() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn test_logout_with_garbage_token_succeeds() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_refresh_token() {
    let (app, state) = create_test_app();
    let pair = login(&state, "ada@example.com", Some(Role::Student)).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let user = state.db.get_user("ada@example.com").await.unwrap().unwrap();
    assert_eq!(user.refresh_token, None);
}

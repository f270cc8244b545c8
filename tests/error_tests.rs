// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use quizroom::error::AppError;

mod common;
use common::body_json;

#[tokio::test]
async fn test_unauthorized_body() {
    let response = AppError::Unauthorized("No token provided").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "No token provided");
    assert!(body.get("requiresReauth").is_none());
}

#[tokio::test]
async fn test_reauth_required_body() {
    let response = AppError::ReauthRequired("User not found").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["message"], "User not found");
    assert_eq!(body["requiresReauth"], true);
}

#[tokio::test]
async fn test_account_missing_is_not_found_with_reauth() {
    let err = AppError::AccountMissing;
    assert!(err.requires_reauth());

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["message"], "User not found");
    assert_eq!(body["requiresReauth"], true);
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let response = AppError::Database("connection refused to 10.0.0.7".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");

    let response = AppError::Internal(anyhow::anyhow!("signing key unavailable")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::NotFound("Invalid or expired session".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::BadRequest("Refresh token required".to_string()).status(),
        StatusCode::BAD_REQUEST
    );
    assert!(!AppError::Forbidden.requires_reauth());
    assert!(!AppError::Unauthorized("Invalid refresh token").requires_reauth());
}

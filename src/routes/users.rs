// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and role routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, UserResponse, UserUpdate};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// User routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(get_me).patch(update_me))
        .route("/users/role", post(set_role))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(auth.user.into())
}

/// Editable profile fields; absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(url, length(max = 2000))]
    pub picture: Option<String>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub school: Option<String>,
}

/// Update name, picture, title or school.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let update = UserUpdate {
        name: body.name,
        picture: body.picture,
        title: body.title,
        school: body.school,
        role: None,
    };

    let updated = state
        .db
        .update_user(&auth.user.email, &update)
        .await?
        .ok_or(AppError::AccountMissing)?;

    tracing::info!(email = %updated.email, "Profile updated");
    Ok(Json(updated.into()))
}

// ─── Role Selection ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub role: Option<String>,
}

/// Set (or change) the caller's role.
///
/// If the account disappears between authentication and the write the
/// response is 404 with `requiresReauth`, so the client starts over.
async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<SetRoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let role: Role = body
        .role
        .as_deref()
        .and_then(|r| r.parse().ok())
        .ok_or_else(|| {
            AppError::BadRequest("Invalid role. Must be \"teacher\" or \"student\"".to_string())
        })?;

    let update = UserUpdate {
        role: Some(role),
        ..Default::default()
    };

    let updated = state
        .db
        .update_user(&auth.user.email, &update)
        .await?
        .ok_or_else(|| {
            tracing::error!(email = %auth.user.email, "User not found after update");
            AppError::AccountMissing
        })?;

    tracing::info!(
        email = %updated.email,
        previous = ?auth.user.role,
        role = %role,
        "Role selected"
    );

    Ok(Json(updated.into()))
}

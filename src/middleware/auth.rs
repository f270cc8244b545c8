// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication and role authorization middleware.

use crate::error::AppError;
use crate::models::{Role, User};
use crate::services::TokenError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user resolved from the access token and the user store.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized("No token provided"))?;

    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed authorization header"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthorized("Malformed authorization header")),
    }
}

/// Resolve request headers into the current user. Never writes.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers)?;

    let claims = state.tokens.verify_access_token(token).map_err(|err| {
        match err {
            TokenError::Expired => tracing::debug!("Access token expired"),
            _ => tracing::warn!(error = %err, "Access token rejected"),
        }
        AppError::Unauthorized("Invalid or expired access token")
    })?;

    let user = state.db.get_user(&claims.email).await?.ok_or_else(|| {
        tracing::warn!(email = %claims.email, "Token subject no longer exists");
        AppError::ReauthRequired("User not found")
    })?;

    Ok(user)
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;

    tracing::debug!(email = %user.email, role = ?user.role, "Request authenticated");
    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

/// Whether `user` holds one of `allowed`. A user with no role never passes.
pub fn role_permits(user: &User, allowed: &[Role]) -> bool {
    user.role.is_some_and(|role| allowed.contains(&role))
}

/// Middleware that restricts a router to the given roles.
///
/// Must run after `require_auth`; without an `AuthUser` the request is 401.
pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthorized("Authentication required"))?;

    if !role_permits(&auth.user, allowed) {
        tracing::warn!(
            email = %auth.user.email,
            role = ?auth.user.role,
            allowed = ?allowed,
            "Role not permitted"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

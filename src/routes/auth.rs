// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth login, session handoff, token refresh and logout routes.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::bearer_token;
use crate::models::SessionRecord;
use crate::services::oauth_state::{sign_state, verify_state};
use crate::services::TokenPair;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/session/{session_id}", get(exchange_session))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// 302 Found with a `Location` header.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// First characters of a session id, enough to correlate log lines.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Start OAuth flow - redirect to Google authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Response> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let oauth_state = sign_state(&state.config.oauth_state_key, now_ms)?;
    let auth_url = state.google.authorization_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.google_client_id,
        "Starting OAuth flow, redirecting to Google"
    );

    Ok(found(auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Why a login attempt ended; rendered into the frontend redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    NoCode,
    TokenExchange,
    UserInfo,
    AuthFailed,
}

impl LoginFailure {
    pub fn code(&self) -> &'static str {
        match self {
            LoginFailure::NoCode => "no_code",
            LoginFailure::TokenExchange => "token_exchange_failed",
            LoginFailure::UserInfo => "user_info_failed",
            LoginFailure::AuthFailed => "auth_failed",
        }
    }
}

/// OAuth callback - exchange code, upsert user, park tokens in a one-time session.
///
/// Every outcome is a redirect to the frontend; errors travel as `?error=<code>`.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let frontend_url = &state.config.frontend_url;

    match complete_login(&state, params).await {
        Ok(session_id) => {
            tracing::info!(session = short_id(&session_id), "Login complete, redirecting to frontend");
            found(format!(
                "{}/auth/callback?sessionId={}",
                frontend_url, session_id
            ))
        }
        Err(failure) => found(format!("{}/?error={}", frontend_url, failure.code())),
    }
}

/// Log a post-provider failure and collapse it to `auth_failed`.
fn auth_failed(stage: &'static str, err: impl std::fmt::Display) -> LoginFailure {
    tracing::error!(error = %err, stage, "Login failed");
    LoginFailure::AuthFailed
}

async fn complete_login(
    state: &AppState,
    params: CallbackParams,
) -> std::result::Result<String, LoginFailure> {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        if let Some(error) = params.error {
            tracing::warn!(error = %error, "OAuth error from Google");
        } else {
            tracing::warn!("OAuth callback without code");
        }
        return Err(LoginFailure::NoCode);
    };

    tracing::info!("Exchanging authorization code for tokens");
    let provider_tokens = state.google.exchange_code(&code).await.map_err(|e| {
        tracing::error!(error = %e, "Token exchange failed");
        LoginFailure::TokenExchange
    })?;

    let profile = state
        .google
        .fetch_profile(&provider_tokens.access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User info fetch failed");
            LoginFailure::UserInfo
        })?;

    tracing::info!(email = %profile.email, "Google profile received");

    // Nothing is stored for a login that did not start at /auth/google.
    let now_ms = chrono::Utc::now().timestamp_millis();
    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| verify_state(s, &state.config.oauth_state_key, now_ms));
    if !state_ok {
        return Err(auth_failed(
            "verify_state",
            "missing, stale or tampered OAuth state parameter",
        ));
    }

    match state.db.purge_expired_sessions().await {
        Ok(0) => {}
        Ok(count) => tracing::debug!(count, "Purged expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions, continuing anyway"),
    }

    let user = state
        .db
        .upsert_login_user(&profile)
        .await
        .map_err(|e| auth_failed("upsert_user", e))?;

    let pair = state
        .tokens
        .issue_pair(&user)
        .map_err(|e| auth_failed("issue_tokens", e))?;

    // Overwriting the slot revokes every refresh token issued before this login.
    state
        .db
        .set_refresh_token(&user.email, Some(&pair.refresh_token))
        .await
        .map_err(|e| auth_failed("store_refresh_token", e))?;

    let ttl = chrono::Duration::from_std(state.config.session_ttl)
        .map_err(|e| auth_failed("session_ttl", e))?;
    let session = SessionRecord::new(pair.access_token, pair.refresh_token, chrono::Utc::now(), ttl);

    state
        .db
        .create_session(&session)
        .await
        .map_err(|e| auth_failed("create_session", e))?;

    Ok(session.id)
}

/// Hand over the tokens parked under a session id, exactly once.
///
/// Missing, expired, malformed and already-consumed ids all look the same.
async fn exchange_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<TokenPair>> {
    let session = state.db.consume_session(&session_id).await?.ok_or_else(|| {
        tracing::info!(session = short_id(&session_id), "Session not found or expired");
        AppError::NotFound("Invalid or expired session".to_string())
    })?;

    tracing::info!(session = short_id(&session.id), "Session exchanged");

    Ok(Json(TokenPair {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Exchange the current refresh token for a new access token.
///
/// The presented token must equal the user's stored single-slot value; a
/// newer login overwrites that slot and so revokes older tokens.
async fn refresh(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    const INVALID: &str = "Invalid refresh token";

    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let token = body
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Refresh token required".to_string()))?;

    let claims = state.tokens.verify_refresh_token(&token).map_err(|e| {
        tracing::info!(error = %e, "Refresh token failed verification");
        AppError::Unauthorized(INVALID)
    })?;

    let user = state.db.get_user(&claims.email).await?.ok_or_else(|| {
        tracing::warn!(email = %claims.email, "Refresh for unknown user");
        AppError::Unauthorized(INVALID)
    })?;

    let current = user.refresh_token.as_deref().unwrap_or_default();
    if current.is_empty() || !bool::from(current.as_bytes().ct_eq(token.as_bytes())) {
        tracing::warn!(email = %user.email, "Refresh token superseded or revoked");
        return Err(AppError::Unauthorized(INVALID));
    }

    let access_token = state
        .tokens
        .issue_access_token(&user)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(email = %user.email, "Access token refreshed");

    Ok(Json(RefreshResponse { access_token }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Logout - clear the stored refresh token when the caller can be identified.
///
/// Always succeeds; the client clears its own tokens regardless.
async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<LogoutResponse> {
    if let Ok(token) = bearer_token(&headers) {
        match state.tokens.verify_access_token(token) {
            Ok(claims) => match state.db.set_refresh_token(&claims.email, None).await {
                Ok(()) => tracing::info!(email = %claims.email, "User logged out"),
                Err(e) => tracing::warn!(error = %e, "Failed to clear refresh token on logout"),
            },
            Err(e) => tracing::debug!(error = %e, "Logout with unverifiable token"),
        }
    }

    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

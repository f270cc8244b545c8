// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the Quizroom API.
//!
//! Keeps the token pair in a [`TokenStorage`], attaches the access token to
//! every request, and refreshes it once on a 401 before giving up.

pub mod api;
pub mod session_guard;
pub mod storage;

pub use api::{ApiClient, ProfileChanges};
pub use session_guard::{ExchangeState, SessionExchangeGuard};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

/// Errors surfaced to callers of [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Refresh failed; stored tokens have been cleared.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// The server no longer recognizes the account; stored tokens have been cleared.
    #[error("Re-authentication required: {0}")]
    ReauthRequired(String),

    #[error("Invalid or expired session")]
    SessionNotFound,

    #[error("Session exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(String),
}

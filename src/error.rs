// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// The message shown to clients is fixed per variant; details carried by
/// `Database` and `Internal` only reach the server log.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Credential missing, malformed, expired or forged.
    #[error("Authentication failed: {0}")]
    Unauthorized(&'static str),

    /// The credential verified but its account no longer exists.
    #[error("Re-authentication required: {0}")]
    ReauthRequired(&'static str),

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The authenticated account disappeared while the request was in flight.
    #[error("Account not found")]
    AccountMissing,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_reauth: bool,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::ReauthRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::AccountMissing => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client must discard its credentials and log in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, AppError::ReauthRequired(_) | AppError::AccountMissing)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let requires_reauth = self.requires_reauth();

        let message = match &self {
            AppError::Unauthorized(reason) | AppError::ReauthRequired(reason) => {
                reason.to_string()
            }
            AppError::Forbidden => "Insufficient permissions".to_string(),
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::AccountMissing => "User not found".to_string(),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "Internal server error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal server error".to_string()
            }
        };

        let body = ErrorResponse {
            error: true,
            message,
            requires_reauth,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

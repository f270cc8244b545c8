// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token-aware API client.

use crate::client::{ClientError, TokenStorage};
use crate::models::{Role, UserResponse};
use crate::services::TokenPair;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Error body produced by the server.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    requires_reauth: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Profile fields to change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn TokenStorage>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        storage: Arc<dyn TokenStorage>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn storage(&self) -> &Arc<dyn TokenStorage> {
        &self.storage
    }

    /// Where the browser goes to start Google sign-in.
    pub fn login_url(&self) -> String {
        self.url("/auth/google")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send a request with the stored access token.
    ///
    /// On 401, if a refresh token is stored, refreshes once and retries once.
    /// A failed refresh clears both tokens and yields [`ClientError::SessionExpired`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self.storage.access_token();
        let response = self
            .send_once(&method, path, body.as_ref(), token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(refresh_token) = self.storage.refresh_token() else {
            return Ok(response);
        };

        tracing::debug!(path, "Access token rejected, refreshing");
        let access_token = match self.refresh_access_token(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(error = %e, "Token refresh failed, clearing session");
                self.storage.clear()?;
                return Err(ClientError::SessionExpired);
            }
        };

        self.send_once(&method, path, body.as_ref(), Some(&access_token))
            .await
    }

    /// [`send`](Self::send) and decode a JSON success body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, body).await?;
        decode(response).await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ClientError> {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let response = self
            .send_once(&Method::POST, "/auth/refresh", Some(&body), None)
            .await?;
        let refreshed: RefreshResponse = decode(response).await?;
        self.storage.set_access_token(&refreshed.access_token)?;
        Ok(refreshed.access_token)
    }

    /// Trade a one-time session id for the token pair and store it.
    pub async fn exchange_session(&self, session_id: &str) -> Result<TokenPair, ClientError> {
        let path = format!("/auth/session/{}", urlencoding::encode(session_id));
        let response = self.send_once(&Method::GET, &path, None, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::SessionNotFound);
        }

        let pair: TokenPair = decode(response).await?;
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(ClientError::ExchangeFailed(
                "Incomplete token pair in session response".to_string(),
            ));
        }
        self.storage.set_tokens(&pair)?;
        Ok(pair)
    }

    pub async fn current_user(&self) -> Result<UserResponse, ClientError> {
        self.request(Method::GET, "/users/me", None).await
    }

    pub async fn update_profile(&self, changes: &ProfileChanges) -> Result<UserResponse, ClientError> {
        let body = serde_json::to_value(changes)?;
        self.request(Method::PATCH, "/users/me", Some(body)).await
    }

    /// Choose a role.
    ///
    /// Not retried: a 401 or a `requiresReauth` response means the account is
    /// gone, so stored tokens are cleared and the caller must sign in again.
    pub async fn select_role(&self, role: Role) -> Result<UserResponse, ClientError> {
        let body = serde_json::json!({ "role": role });
        let token = self.storage.access_token();
        let response = self
            .send_once(&Method::POST, "/users/role", Some(&body), token.as_deref())
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error = error_body(response).await;
        let message = error
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        if status == StatusCode::UNAUTHORIZED || error.requires_reauth {
            tracing::info!(status = status.as_u16(), "Role selection needs re-authentication");
            self.storage.clear()?;
            return Err(ClientError::ReauthRequired(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Tell the server to forget the refresh token, then clear local tokens.
    ///
    /// Server errors are ignored; local tokens are always cleared.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let token = self.storage.access_token();
        if let Err(e) = self
            .send_once(&Method::POST, "/auth/logout", None, token.as_deref())
            .await
        {
            tracing::warn!(error = %e, "Logout request failed");
        }
        self.storage.clear()
    }
}

async fn error_body(response: reqwest::Response) -> ApiErrorBody {
    response.json().await.unwrap_or_default()
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let error = error_body(response).await;
    Err(ClientError::Api {
        status: status.as_u16(),
        message: error
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string()),
    })
}

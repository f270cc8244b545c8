// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client for the login flow.
//!
//! Handles:
//! - Building the authorization redirect URL
//! - Exchanging an authorization code for provider tokens
//! - Fetching the signed-in user's profile
//!
//! Calls are never retried; a failure ends that login attempt.

use crate::config::Config;
use crate::models::GoogleProfile;
use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const SCOPE: &str = "profile email";

/// Provider failure categories; each maps to its own redirect error code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OAuthError {
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("user info fetch failed: {0}")]
    UserInfo(String),
}

/// Token response from the provider's code exchange.
///
/// Only the access token is used, to fetch the profile once.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OAuth HTTP client")?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            callback_url: config.google_callback_url.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            userinfo_url: config.google_userinfo_url.clone(),
        })
    }

    /// Authorization URL: fixed scope, offline access, forced consent.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             prompt=consent&\
             state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for provider tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, OAuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchange(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("JSON parse error: {}", e)))
    }

    /// Fetch the profile of the user who granted `access_token`.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, OAuthError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfo(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::UserInfo(format!("HTTP {}: {}", status, body)));
        }

        let profile: GoogleProfile = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfo(format!("JSON parse error: {}", e)))?;

        if profile.email.trim().is_empty() {
            return Err(OAuthError::UserInfo("profile has no email".to_string()));
        }

        Ok(profile)
    }
}

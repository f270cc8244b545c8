// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google;
pub mod oauth_state;
pub mod tokens;

pub use google::{GoogleOAuthClient, OAuthError};
pub use tokens::{AccessClaims, RefreshClaims, TokenError, TokenPair, TokenService};

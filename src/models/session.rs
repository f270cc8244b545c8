// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time login handoff record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

/// Tokens parked between the OAuth callback and the frontend's exchange call.
///
/// Readable at most once; consumption deletes the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: String,
    pub expires_at: String,
}

impl SessionRecord {
    /// Create a record with a fresh random id.
    pub fn new(
        access_token: String,
        refresh_token: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            access_token,
            refresh_token,
            created_at: format_utc_rfc3339(now),
            expires_at: format_utc_rfc3339(now + ttl),
        }
    }

    /// A record whose expiry cannot be parsed counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        parse_utc_rfc3339(&self.expires_at)
            .map(|expires_at| expires_at <= now)
            .unwrap_or(true)
    }
}

/// Normalize a client-supplied session id, rejecting anything that is not a UUID.
pub fn parse_session_id(raw: &str) -> Option<String> {
    uuid::Uuid::parse_str(raw.trim())
        .ok()
        .map(|id| id.hyphenated().to_string())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.
//!
//! State lives for as long as the `MemoryDb` handle (and its clones); it is
//! created at startup and dropped with the process.

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::session::parse_session_id;
use crate::models::{GoogleProfile, SessionRecord, User, UserUpdate};
use crate::time_utils::now_rfc3339;

/// Users keyed by email, sessions keyed by id.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    sessions: Arc<DashMap<String, SessionRecord>>,
    /// Accounts deleted by their next `update_user` call, before it applies.
    vanish_on_update: Arc<DashSet<String>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    pub async fn upsert_login_user(&self, profile: &GoogleProfile) -> Result<User, AppError> {
        let now = now_rfc3339();
        let mut entry = self
            .users
            .entry(profile.email.clone())
            .or_insert_with(|| User::new(profile, &now));
        entry.apply(
            &UserUpdate {
                name: Some(profile.name.clone()),
                picture: Some(profile.picture.clone().unwrap_or_default()),
                ..Default::default()
            },
            &now,
        );
        Ok(entry.clone())
    }

    pub async fn update_user(
        &self,
        email: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, AppError> {
        if self.vanish_on_update.remove(email).is_some() {
            self.users.remove(email);
        }
        Ok(self.users.get_mut(email).map(|mut user| {
            user.apply(update, &now_rfc3339());
            user.clone()
        }))
    }

    pub async fn set_refresh_token(
        &self,
        email: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(email) {
            user.refresh_token = refresh_token.map(str::to_string);
            user.updated_at = now_rfc3339();
        }
        Ok(())
    }

    pub async fn delete_user(&self, email: &str) -> Result<(), AppError> {
        self.users.remove(email);
        Ok(())
    }

    // ─── Session Operations ──────────────────────────────────────

    pub async fn create_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    /// `DashMap::remove` is atomic, so exactly one caller gets the record.
    pub async fn consume_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        let Some(id) = parse_session_id(id) else {
            return Ok(None);
        };
        Ok(self
            .sessions
            .remove(&id)
            .map(|(_, session)| session)
            .filter(|session| !session.is_expired_at(Utc::now())))
    }

    pub async fn purge_expired_sessions(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    /// Delete `email` at the start of its next update, as if another request
    /// removed the account after this one authenticated (test support).
    pub fn remove_user_before_next_update(&self, email: &str) {
        self.vanish_on_update.insert(email.to_string());
    }

    /// Number of stored users (test introspection).
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of stored sessions, expired ones included (test introspection).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

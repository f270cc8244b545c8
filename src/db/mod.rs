// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore in production, in-memory for development/tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{GoogleProfile, SessionRecord, User, UserUpdate};

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by email)
    pub const USERS: &str = "users";
    /// One-time login handoff records (keyed by session id)
    pub const SESSIONS: &str = "sessions";
}

/// The backend selected at startup.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $call:expr) => {
        match $self {
            Database::Firestore($db) => $call,
            Database::Memory($db) => $call,
        }
    };
}

impl Database {
    /// Connect to the backend named in the config.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage_backend {
            StorageBackend::Firestore => Ok(Self::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::Memory(MemoryDb::new()))
            }
        }
    }

    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.get_user(email).await)
    }

    pub async fn upsert_login_user(&self, profile: &GoogleProfile) -> Result<User, AppError> {
        dispatch!(self, db => db.upsert_login_user(profile).await)
    }

    pub async fn update_user(
        &self,
        email: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.update_user(email, update).await)
    }

    pub async fn set_refresh_token(
        &self,
        email: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        dispatch!(self, db => db.set_refresh_token(email, refresh_token).await)
    }

    pub async fn delete_user(&self, email: &str) -> Result<(), AppError> {
        dispatch!(self, db => db.delete_user(email).await)
    }

    pub async fn create_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        dispatch!(self, db => db.create_session(session).await)
    }

    /// Atomically read and delete a session; `None` if missing, expired,
    /// malformed or already consumed.
    pub async fn consume_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        dispatch!(self, db => db.consume_session(id).await)
    }

    pub async fn purge_expired_sessions(&self) -> Result<usize, AppError> {
        dispatch!(self, db => db.purge_expired_sessions().await)
    }
}

impl From<MemoryDb> for Database {
    fn from(db: MemoryDb) -> Self {
        Self::Memory(db)
    }
}

impl From<FirestoreDb> for Database {
    fn from(db: FirestoreDb) -> Self {
        Self::Firestore(db)
    }
}

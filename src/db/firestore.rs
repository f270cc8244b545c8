// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, role and the single current refresh token)
//! - Sessions (one-time OAuth login handoff records)
//!
//! Every write touches a single document; there are no cross-collection
//! transactions.

use crate::db::collections;
use crate::error::AppError;
use crate::models::session::parse_session_id;
use crate::models::{GoogleProfile, SessionRecord, User, UserUpdate};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use firestore::errors::FirestoreError;
use firestore::{paths, FirestoreWritePrecondition};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client; every operation returns a database error.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by email.
    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create the user on first login, otherwise refresh name and picture.
    pub async fn upsert_login_user(&self, profile: &GoogleProfile) -> Result<User, AppError> {
        let now = now_rfc3339();

        match self.get_user(&profile.email).await? {
            None => {
                let user = User::new(profile, &now);
                let created: User = self
                    .get_client()?
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .precondition(FirestoreWritePrecondition::Exists(false))
                    .document_id(&user.email)
                    .object(&user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                tracing::info!(email = %created.email, "Created user");
                Ok(created)
            }
            Some(mut user) => {
                user.apply(
                    &UserUpdate {
                        name: Some(profile.name.clone()),
                        picture: Some(profile.picture.clone().unwrap_or_default()),
                        ..Default::default()
                    },
                    &now,
                );
                self.get_client()?
                    .fluent()
                    .update()
                    .fields(paths!(User::{name, picture, updated_at}))
                    .in_col(collections::USERS)
                    .document_id(&user.email)
                    .object(&user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
        }
    }

    /// Apply a partial update. Returns `None` if the user does not exist.
    pub async fn update_user(
        &self,
        email: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, AppError> {
        let Some(mut user) = self.get_user(email).await? else {
            tracing::warn!(email, "User not found before update");
            return Ok(None);
        };
        user.apply(update, &now_rfc3339());

        let result: Result<User, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{name, picture, title, school, role, updated_at}))
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(email)
            .object(&user)
            .execute()
            .await;

        match result {
            Ok(updated) => Ok(Some(updated)),
            Err(FirestoreError::DataNotFoundError(_)) => {
                tracing::warn!(email, "User vanished during update");
                Ok(None)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Overwrite (or clear) the user's single refresh-token slot.
    ///
    /// Missing users are ignored.
    pub async fn set_refresh_token(
        &self,
        email: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(mut user) = self.get_user(email).await? else {
            return Ok(());
        };
        user.refresh_token = refresh_token.map(str::to_string);
        user.updated_at = now_rfc3339();

        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{refresh_token, updated_at}))
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(email)
            .object(&user)
            .execute()
            .await;

        match result {
            Ok(()) | Err(FirestoreError::DataNotFoundError(_)) => Ok(()),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Delete a user document.
    pub async fn delete_user(&self, email: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(email)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Store a new one-time session.
    pub async fn create_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Read and delete a session in one step.
    ///
    /// The delete carries an `Exists(true)` precondition: when two callers
    /// race on the same id only one delete succeeds, and only that caller
    /// receives the tokens.
    pub async fn consume_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        let Some(id) = parse_session_id(id) else {
            return Ok(None);
        };
        let client = self.get_client()?;

        let session: Option<SessionRecord> = client
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(&id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(session) = session else {
            return Ok(None);
        };

        let deleted = client
            .fluent()
            .delete()
            .from(collections::SESSIONS)
            .document_id(&id)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match deleted {
            Ok(()) => {}
            Err(FirestoreError::DataNotFoundError(_)) | Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!("Session already consumed by a concurrent request");
                return Ok(None);
            }
            Err(e) => return Err(AppError::Database(e.to_string())),
        }

        if session.is_expired_at(chrono::Utc::now()) {
            tracing::debug!("Session expired before exchange");
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Delete every session whose expiry has passed.
    ///
    /// Returns the number of documents deleted.
    pub async fn purge_expired_sessions(&self) -> Result<usize, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());

        let expired: Vec<SessionRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(move |q| q.for_all([q.field("expires_at").less_than_or_equal(now.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = expired.len();
        self.batch_delete(&expired, collections::SESSIONS, |s: &SessionRecord| {
            s.id.clone()
        })
        .await?;

        Ok(count)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side token storage.

use crate::client::ClientError;
use crate::services::TokenPair;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Where the client keeps its access and refresh tokens. Both absent by default.
pub trait TokenStorage: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, pair: &TokenPair) -> Result<(), ClientError>;
    fn set_access_token(&self, token: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Tokens held for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStorage {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn access_token(&self) -> Option<String> {
        read(&self.tokens).access_token
    }

    fn refresh_token(&self) -> Option<String> {
        read(&self.tokens).refresh_token
    }

    fn set_tokens(&self, pair: &TokenPair) -> Result<(), ClientError> {
        let mut tokens = write(&self.tokens);
        tokens.access_token = Some(pair.access_token.clone());
        tokens.refresh_token = Some(pair.refresh_token.clone());
        Ok(())
    }

    fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        write(&self.tokens).access_token = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *write(&self.tokens) = StoredTokens::default();
        Ok(())
    }
}

/// Tokens persisted to a JSON file so they survive restarts.
pub struct FileTokenStorage {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl FileTokenStorage {
    /// Open (or lazily create) the token file. An unreadable file counts as empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let tokens = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            path,
            tokens: RwLock::new(tokens),
        }
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<(), ClientError> {
        let json =
            serde_json::to_vec_pretty(tokens).map_err(|e| ClientError::Storage(e.to_string()))?;
        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| ClientError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn update(&self, f: impl FnOnce(&mut StoredTokens)) -> Result<(), ClientError> {
        let mut tokens = write(&self.tokens);
        f(&mut tokens);
        self.persist(&tokens)
    }
}

impl TokenStorage for FileTokenStorage {
    fn access_token(&self) -> Option<String> {
        read(&self.tokens).access_token
    }

    fn refresh_token(&self) -> Option<String> {
        read(&self.tokens).refresh_token
    }

    fn set_tokens(&self, pair: &TokenPair) -> Result<(), ClientError> {
        self.update(|t| {
            t.access_token = Some(pair.access_token.clone());
            t.refresh_token = Some(pair.refresh_token.clone());
        })
    }

    fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        self.update(|t| t.access_token = Some(token.to_string()))
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.update(|t| *t = StoredTokens::default())
    }
}

fn read(lock: &RwLock<StoredTokens>) -> StoredTokens {
    lock.read().unwrap_or_else(|e| e.into_inner()).clone()
}

fn write(lock: &RwLock<StoredTokens>) -> std::sync::RwLockWriteGuard<'_, StoredTokens> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_memory_storage_lifecycle() {
        let storage = MemoryTokenStorage::new();
        assert_eq!(storage.access_token(), None);
        assert_eq!(storage.refresh_token(), None);

        storage.set_tokens(&pair()).unwrap();
        storage.set_access_token("access2").unwrap();
        assert_eq!(storage.access_token().as_deref(), Some("access2"));
        assert_eq!(storage.refresh_token().as_deref(), Some("refresh"));

        storage.clear().unwrap();
        assert_eq!(storage.access_token(), None);
        assert_eq!(storage.refresh_token(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let path = std::env::temp_dir().join(format!("quizroom-tokens-{}.json", uuid::Uuid::new_v4()));

        let storage = FileTokenStorage::open(&path);
        assert_eq!(storage.access_token(), None);
        storage.set_tokens(&pair()).unwrap();

        let reopened = FileTokenStorage::open(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("access"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("refresh"));

        reopened.clear().unwrap();
        let cleared = FileTokenStorage::open(&path);
        assert_eq!(cleared.access_token(), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_storage_ignores_corrupt_file() {
        let path = std::env::temp_dir().join(format!("quizroom-tokens-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"{not json").unwrap();

        let storage = FileTokenStorage::open(&path);
        assert_eq!(storage.refresh_token(), None);

        let _ = std::fs::remove_file(&path);
    }
}

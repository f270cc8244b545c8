// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! At-most-once session exchange.
//!
//! The sign-in callback page can run more than once for the same session id
//! (re-renders, double navigation). The server consumes a session on first
//! read, so a second exchange would see 404 and wrongly report failure. The
//! guard shares one in-flight exchange per id and remembers its outcome.

use crate::client::{ApiClient, ClientError};
use crate::services::TokenPair;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    NotStarted,
    InFlight,
    Completed,
}

/// Cloneable outcome cached for late callers.
#[derive(Debug, Clone)]
enum ExchangeFailure {
    NotFound,
    Failed(String),
}

type Outcome = Result<TokenPair, ExchangeFailure>;

#[derive(Default)]
pub struct SessionExchangeGuard {
    attempts: DashMap<String, Arc<OnceCell<Outcome>>>,
}

impl SessionExchangeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, session_id: &str) -> ExchangeState {
        match self.attempts.get(session_id) {
            None => ExchangeState::NotStarted,
            Some(cell) if cell.initialized() => ExchangeState::Completed,
            Some(_) => ExchangeState::InFlight,
        }
    }

    /// Exchange `session_id` through `client`, sending at most one request per id.
    ///
    /// Concurrent callers wait on the first one's result. If the server says
    /// the session is gone but tokens are already stored, those tokens are
    /// returned instead of an error.
    pub async fn exchange(
        &self,
        client: &ApiClient,
        session_id: &str,
    ) -> Result<TokenPair, ClientError> {
        let cell = self
            .attempts
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let outcome = cell
            .get_or_init(|| async {
                match client.exchange_session(session_id).await {
                    Ok(pair) => Ok(pair),
                    Err(ClientError::SessionNotFound) => Err(ExchangeFailure::NotFound),
                    Err(e) => {
                        tracing::warn!(error = %e, "Session exchange failed");
                        Err(ExchangeFailure::Failed(e.to_string()))
                    }
                }
            })
            .await
            .clone();

        match outcome {
            Ok(pair) => Ok(pair),
            Err(ExchangeFailure::NotFound) => {
                let storage = client.storage();
                match (storage.access_token(), storage.refresh_token()) {
                    (Some(access_token), Some(refresh_token)) => {
                        tracing::debug!("Session already consumed, using stored tokens");
                        Ok(TokenPair {
                            access_token,
                            refresh_token,
                        })
                    }
                    _ => Err(ClientError::SessionNotFound),
                }
            }
            Err(ExchangeFailure::Failed(message)) => Err(ClientError::ExchangeFailed(message)),
        }
    }

    /// Forget every attempt, e.g. after logout.
    pub fn reset(&self) {
        self.attempts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_not_started() {
        let guard = SessionExchangeGuard::new();
        assert_eq!(guard.state("abc"), ExchangeState::NotStarted);
    }

    #[test]
    fn test_reset_forgets_attempts() {
        let guard = SessionExchangeGuard::new();
        guard
            .attempts
            .insert("abc".to_string(), Arc::new(OnceCell::new()));
        assert_eq!(guard.state("abc"), ExchangeState::InFlight);

        guard.reset();
        assert_eq!(guard.state("abc"), ExchangeState::NotStarted);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quizroom: classroom lessons and quizzes for teachers and students
//!
//! This crate provides the authentication core of the Quizroom backend
//! (Google sign-in, one-time session handoff, JWT access/refresh tokens,
//! per-request authentication and role checks) and the matching client
//! that keeps tokens fresh.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{GoogleOAuthClient, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub tokens: TokenService,
    pub google: GoogleOAuthClient,
}

impl AppState {
    /// Build state from config and an already-connected database.
    pub fn new(config: Config, db: Database) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(&config);
        let google = GoogleOAuthClient::new(&config)?;
        Ok(Self {
            config,
            db,
            tokens,
            google,
        })
    }
}
